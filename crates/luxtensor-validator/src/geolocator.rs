/// Maps a miner's IP address to a (subregion, country) pair used by the
/// latency and distribution sub-scores. Implementations typically wrap a
/// MaxMind-style database or a third-party geolocation API.
pub trait Geolocator: Send + Sync {
    fn lookup(&self, ip: &str) -> (String, String);
}

/// Fixed fallback used whenever a lookup misses: Northern Europe, GB. Kept
/// as a free function so a custom `Geolocator` can reuse it verbatim.
pub fn fallback_location() -> (String, String) {
    ("Northern Europe".to_string(), "GB".to_string())
}

/// In-memory table over a small set of known ranges, falling back to
/// [`fallback_location`] for anything unrecognized. Good enough for local
/// runs and tests; production deployments should inject a real database.
pub struct StaticGeolocator {
    table: std::collections::HashMap<String, (String, String)>,
}

impl StaticGeolocator {
    pub fn new(table: std::collections::HashMap<String, (String, String)>) -> Self {
        Self { table }
    }
}

impl Geolocator for StaticGeolocator {
    fn lookup(&self, ip: &str) -> (String, String) {
        self.table.get(ip).cloned().unwrap_or_else(fallback_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ip_resolves_to_its_table_entry() {
        let mut table = std::collections::HashMap::new();
        table.insert("1.2.3.4".to_string(), ("Western Europe".to_string(), "FR".to_string()));
        let geo = StaticGeolocator::new(table);

        assert_eq!(geo.lookup("1.2.3.4"), ("Western Europe".to_string(), "FR".to_string()));
    }

    #[test]
    fn unknown_ip_falls_back_to_northern_europe_gb() {
        let geo = StaticGeolocator::new(std::collections::HashMap::new());
        assert_eq!(geo.lookup("9.9.9.9"), fallback_location());
        assert_eq!(fallback_location(), ("Northern Europe".to_string(), "GB".to_string()));
    }
}
