pub(crate) fn load_fixture(name: &str) -> String {
    let path = format!("{}/fixtures/code/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(path).unwrap()
}
