use super::is_installer;

/// `start.sh` and `start.bat` for the given artifact and heap size.
///
/// A runnable jar is started directly. An installer is run once with
/// `--installServer`, after which the loader's own `run` script takes over.
pub fn synthesize_start_scripts(file_name: &str, ram_mb: u32) -> (String, String) {
    let heap = format!("-Xms{ram_mb}M -Xmx{ram_mb}M");

    if is_installer(file_name) {
        (installer_sh(file_name, &heap), installer_bat(file_name, &heap))
    } else {
        (server_sh(file_name, &heap), server_bat(file_name, &heap))
    }
}

fn server_sh(file_name: &str, heap: &str) -> String {
    format!(
        "#!/bin/sh\n\
         cd \"$(dirname \"$0\")\"\n\
         exec java {heap} -jar \"{file_name}\" nogui\n"
    )
}

fn installer_sh(file_name: &str, heap: &str) -> String {
    format!(
        "#!/bin/sh\n\
         set -e\n\
         cd \"$(dirname \"$0\")\"\n\
         if [ ! -f run.sh ]; then\n\
         \x20   java -jar \"{file_name}\" --installServer\n\
         fi\n\
         echo \"{heap}\" > user_jvm_args.txt\n\
         exec sh ./run.sh nogui\n"
    )
}

/// Batch files keep CRLF line endings.
fn server_bat(file_name: &str, heap: &str) -> String {
    crlf(&format!(
        "@echo off\n\
         cd /d \"%~dp0\"\n\
         java {heap} -jar \"{file_name}\" nogui\n\
         pause\n"
    ))
}

fn installer_bat(file_name: &str, heap: &str) -> String {
    crlf(&format!(
        "@echo off\n\
         cd /d \"%~dp0\"\n\
         if not exist run.bat (\n\
         \x20   java -jar \"{file_name}\" --installServer\n\
         )\n\
         echo {heap}> user_jvm_args.txt\n\
         call run.bat nogui\n\
         pause\n"
    ))
}

fn crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_jar_is_started_directly() {
        let (sh, bat) = synthesize_start_scripts("minecraft_server.1.20.1.jar", 4096);

        assert!(sh.starts_with("#!/bin/sh\n"));
        assert!(sh.contains("exec java -Xms4096M -Xmx4096M -jar \"minecraft_server.1.20.1.jar\" nogui\n"));
        assert!(!sh.contains('\r'));

        assert!(bat.contains("java -Xms4096M -Xmx4096M -jar \"minecraft_server.1.20.1.jar\" nogui\r\n"));
        assert!(bat.lines().all(|l| !l.ends_with('\r')));
        assert_eq!(bat.matches("\r\n").count(), bat.matches('\n').count());
    }

    #[test]
    fn installer_runs_install_once() {
        let (sh, bat) = synthesize_start_scripts("forge-1.20.1-47.2.0-installer.jar", 2048);

        assert!(sh.contains("if [ ! -f run.sh ]; then\n    java -jar \"forge-1.20.1-47.2.0-installer.jar\" --installServer\nfi\n"));
        assert!(sh.contains("echo \"-Xms2048M -Xmx2048M\" > user_jvm_args.txt\n"));
        assert!(sh.ends_with("exec sh ./run.sh nogui\n"));

        assert!(bat.contains("--installServer\r\n"));
        assert!(bat.contains("call run.bat nogui\r\n"));
    }

    #[test]
    fn generation_is_idempotent() {
        let first = synthesize_start_scripts("fabric-server.jar", 3072);
        let second = synthesize_start_scripts("fabric-server.jar", 3072);
        assert_eq!(first, second);
    }
}
