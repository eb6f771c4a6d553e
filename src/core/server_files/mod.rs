// ─── Server Files ───
// Pure text synthesis for everything shipped next to the server jar.
// No clock, randomness or environment: same input, same bytes.

mod properties;
mod readme;
mod scripts;
mod settings;

pub use properties::{synthesize_eula, synthesize_properties};
pub use readme::synthesize_readme;
pub use scripts::synthesize_start_scripts;
pub use settings::{ServerSettings, DEFAULT_RAM_MB, PROPERTY_TABLE};

/// Whether the artifact is an installer rather than a runnable server.
pub fn is_installer(file_name: &str) -> bool {
    file_name.ends_with("-installer.jar")
}
