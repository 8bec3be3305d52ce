use std::fs;

fn main() {
    // Validate default config at compile time
    let config_path = "src/default_config.toml";
    println!("cargo:rerun-if-changed={}", config_path);

    let content = fs::read_to_string(config_path).expect("Failed to read default_config.toml");

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    if let Some(backend) = table
        .get("renderer")
        .and_then(|r| r.get("backend"))
        .and_then(|b| b.as_str())
    {
        if !["auto", "typst", "md-to-pdf"].contains(&backend) {
            panic!("Invalid default_config.toml: unknown backend {:?}", backend);
        }
    }
}
