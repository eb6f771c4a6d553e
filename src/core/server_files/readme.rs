use std::collections::HashMap;
use std::fmt::Write as _;

use super::is_installer;
use super::settings::ServerSettings;

/// Human-readable summary shipped as `README.txt`.
pub fn synthesize_readme(settings: &HashMap<String, String>, file_name: &str) -> String {
    let settings = ServerSettings::new(settings);
    let mut out = String::new();

    out.push_str("Minecraft server bundle\n");
    out.push_str("=======================\n\n");
    let _ = writeln!(out, "Server file: {file_name}");
    let _ = writeln!(out, "Memory:      {} MB", settings.ram_mb());
    let _ = writeln!(out, "Port:        {}", settings.by_property("server-port"));
    let _ = writeln!(out, "Game mode:   {}", settings.by_property("gamemode"));
    let _ = writeln!(out, "Difficulty:  {}", settings.by_property("difficulty"));
    let _ = writeln!(out, "Max players: {}", settings.by_property("max-players"));
    let _ = writeln!(out, "Online mode: {}", settings.by_property("online-mode"));
    out.push('\n');

    if is_installer(file_name) {
        out.push_str("This bundle contains an INSTALLER, not a ready server.\n");
        out.push_str("The start scripts run it once with --installServer and then\n");
        out.push_str("launch the server it produces. To install by hand:\n\n");
        let _ = writeln!(out, "    java -jar {file_name} --installServer\n");
    }

    out.push_str("Starting the server\n");
    out.push_str("-------------------\n");
    out.push_str("Linux / macOS: ./start.sh\n");
    out.push_str("Windows:       start.bat\n\n");
    out.push_str("Java must be installed and on PATH.\n\n");

    out.push_str("Files\n");
    out.push_str("-----\n");
    out.push_str("server.properties  server configuration\n");
    out.push_str("eula.txt           Minecraft EULA acceptance (https://aka.ms/MinecraftEULA)\n");
    out.push_str("ops.json           operators, empty\n");
    out.push_str("whitelist.json     allow-list, empty\n");

    out
}
