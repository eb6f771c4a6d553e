use std::collections::HashMap;
use std::fmt::Write as _;

use super::settings::ServerSettings;

const HEADER: &str = "#Minecraft server properties\n";

/// Render `server.properties`. Key order is fixed and `eula=true` is
/// appended regardless of what the settings say.
pub fn synthesize_properties(settings: &HashMap<String, String>) -> String {
    let settings = ServerSettings::new(settings);
    let mut out = String::from(HEADER);

    for (key, value) in settings.properties() {
        out.push_str(key);
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }

    out.push_str("eula=true\n");
    out
}

/// `eula.txt` contents.
pub fn synthesize_eula() -> String {
    "#By changing the setting below to TRUE you are indicating your agreement to our EULA (https://aka.ms/MinecraftEULA).\neula=true\n"
        .to_string()
}

/// Java `Properties` value escaping, ASCII-only output.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());

    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0C}' => out.push_str("\\f"),
            ' ' if i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04X}");
                }
            }
        }
    }

    out
}
