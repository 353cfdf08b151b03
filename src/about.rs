pub fn version_cli_text() -> String {
    format!(
        "LocusView {} - interactive genome browser track engine",
        env!("CARGO_PKG_VERSION")
    )
}
