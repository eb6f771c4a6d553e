use std::collections::HashMap;

/// Heap size used by the start scripts when `ram` is absent or unparseable.
pub const DEFAULT_RAM_MB: u32 = 2048;

/// One `server.properties` entry: request key, property key, default.
///
/// Request keys are snake_case (`max_players`); the hyphenated property key
/// (`max-players`) is accepted as well. Order here is output order.
pub const PROPERTY_TABLE: &[(&str, &str, &str)] = &[
    ("motd", "motd", "A Minecraft Server"),
    ("server_port", "server-port", "25565"),
    ("gamemode", "gamemode", "survival"),
    ("difficulty", "difficulty", "normal"),
    ("hardcore", "hardcore", "false"),
    ("max_players", "max-players", "20"),
    ("online_mode", "online-mode", "true"),
    ("pvp", "pvp", "true"),
    ("white_list", "white-list", "false"),
    ("enforce_whitelist", "enforce-whitelist", "false"),
    ("spawn_protection", "spawn-protection", "16"),
    ("view_distance", "view-distance", "10"),
    ("simulation_distance", "simulation-distance", "10"),
    ("level_name", "level-name", "world"),
    ("level_seed", "level-seed", ""),
    ("allow_flight", "allow-flight", "false"),
    ("allow_nether", "allow-nether", "true"),
    ("spawn_monsters", "spawn-monsters", "true"),
    ("spawn_animals", "spawn-animals", "true"),
    ("spawn_npcs", "spawn-npcs", "true"),
    ("generate_structures", "generate-structures", "true"),
    ("enable_command_block", "enable-command-block", "false"),
    ("enable_rcon", "enable-rcon", "false"),
    ("enable_query", "enable-query", "false"),
];

/// Read-only view over a request's settings with per-key defaults.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings<'a> {
    raw: &'a HashMap<String, String>,
}

impl<'a> ServerSettings<'a> {
    pub fn new(raw: &'a HashMap<String, String>) -> Self {
        Self { raw }
    }

    /// Value for a table entry: request key, then property key, then default.
    pub fn property(&self, key: &str, property_key: &str, default: &'a str) -> &'a str {
        self.raw
            .get(key)
            .or_else(|| self.raw.get(property_key))
            .map(|v| v.trim())
            .unwrap_or(default)
    }

    /// Value of a property by its `server.properties` key, with default.
    pub fn by_property(&self, property_key: &str) -> &'a str {
        PROPERTY_TABLE
            .iter()
            .find(|(_, prop, _)| *prop == property_key)
            .map(|(key, prop, default)| self.property(key, prop, default))
            .unwrap_or("")
    }

    /// `server.properties` lines in table order.
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &'a str)> + '_ {
        PROPERTY_TABLE
            .iter()
            .map(move |(key, prop, default)| (*prop, self.property(key, prop, default)))
    }

    /// Heap size in MiB. Accepts `ram` or `ram_mb`; `0` counts as absent.
    pub fn ram_mb(&self) -> u32 {
        self.raw
            .get("ram")
            .or_else(|| self.raw.get("ram_mb"))
            .and_then(|v| v.trim().trim_end_matches(['M', 'm']).parse::<u32>().ok())
            .filter(|mb| *mb > 0)
            .unwrap_or(DEFAULT_RAM_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let raw = HashMap::new();
        let settings = ServerSettings::new(&raw);
        assert_eq!(settings.by_property("gamemode"), "survival");
        assert_eq!(settings.by_property("difficulty"), "normal");
        assert_eq!(settings.by_property("max-players"), "20");
        assert_eq!(settings.by_property("online-mode"), "true");
        assert_eq!(settings.by_property("server-port"), "25565");
        assert_eq!(settings.ram_mb(), DEFAULT_RAM_MB);
    }

    #[test]
    fn snake_case_key_wins_over_property_key() {
        let raw = map(&[("max_players", "10"), ("max-players", "99")]);
        assert_eq!(ServerSettings::new(&raw).by_property("max-players"), "10");

        let raw = map(&[("max-players", "99")]);
        assert_eq!(ServerSettings::new(&raw).by_property("max-players"), "99");
    }

    #[test]
    fn ram_accepts_suffix_and_rejects_garbage() {
        assert_eq!(ServerSettings::new(&map(&[("ram", "4096M")])).ram_mb(), 4096);
        assert_eq!(ServerSettings::new(&map(&[("ram_mb", "1024")])).ram_mb(), 1024);
        assert_eq!(ServerSettings::new(&map(&[("ram", "lots")])).ram_mb(), DEFAULT_RAM_MB);
        assert_eq!(ServerSettings::new(&map(&[("ram", "0")])).ram_mb(), DEFAULT_RAM_MB);
    }

    #[test]
    fn table_has_no_eula_entry() {
        assert!(PROPERTY_TABLE.iter().all(|(k, p, _)| *k != "eula" && *p != "eula"));
    }
}
