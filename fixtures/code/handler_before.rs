use std::collections::HashMap;

pub struct Router {
    routes: HashMap<String, Handler>,
    fallback: Option<Handler>,
}

type Handler = fn(&Request) -> Response;

pub struct Request {
    pub path: String,
    pub body: Vec<u8>,
}

pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: None,
        }
    }

    pub fn route(&mut self, path: &str, handler: Handler) {
        self.routes.insert(path.to_string(), handler);
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        match self.routes.get(&request.path) {
            Some(handler) => handler(request),
            None => match self.fallback {
                Some(fallback) => fallback(request),
                None => Response {
                    status: 404,
                    body: Vec::new(),
                },
            },
        }
    }
}
