/// Number of cases per property, overridable with `PROPTEST_CASES` for
/// longer local runs.
pub fn cases() -> u32 {
    match std::env::var("PROPTEST_CASES") {
        Ok(value) => value.parse().unwrap_or(64),
        Err(_) => 64,
    }
}
