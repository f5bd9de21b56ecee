use crate::grammar::Command;
use crate::types::Plan;
use reqwest::Url;

/// Aliases accepted by `executar_comando`. Read-only commands only.
pub const SAFE_COMMANDS: &[&str] = &[
    "date",
    "time",
    "dir",
    "whoami",
    "hostname",
    "ipconfig",
    "systeminfo",
    "tasklist",
];

/// Maps an allow-listed alias to the argv actually run on this OS.
/// Anything outside the list is `None`, however harmless it looks.
pub fn resolve_safe_command(alias: &str) -> Option<Vec<&'static str>> {
    let alias = alias.trim().to_lowercase();
    if !SAFE_COMMANDS.contains(&alias.as_str()) {
        return None;
    }

    let argv: &[&'static str] = if cfg!(windows) {
        match alias.as_str() {
            "date" => &["cmd", "/C", "date /t"],
            "time" => &["cmd", "/C", "time /t"],
            "dir" => &["cmd", "/C", "dir"],
            "whoami" => &["whoami"],
            "hostname" => &["hostname"],
            "ipconfig" => &["ipconfig"],
            "systeminfo" => &["systeminfo"],
            _ => &["tasklist"],
        }
    } else {
        match alias.as_str() {
            "date" => &["date", "+%d/%m/%Y"],
            "time" => &["date", "+%H:%M:%S"],
            "dir" => &["ls", "-la"],
            "whoami" => &["whoami"],
            "hostname" => &["hostname"],
            "ipconfig" if cfg!(target_os = "macos") => &["ifconfig"],
            "ipconfig" => &["ip", "addr"],
            "systeminfo" => &["uname", "-a"],
            _ => &["ps", "-e"],
        }
    };
    Some(argv.to_vec())
}

/// Resolves a program alias to something launchable; unknown names pass through.
pub fn resolve_program(name: &str) -> String {
    let key = name.trim().to_lowercase();
    let windows = cfg!(windows);
    let macos = cfg!(target_os = "macos");

    let resolved = match key.as_str() {
        "notepad" | "bloco" | "editor" if windows => "notepad.exe",
        "notepad" | "bloco" | "editor" if macos => "TextEdit",
        "notepad" | "bloco" | "editor" => "gedit",
        "calculadora" | "calc" if windows => "calc.exe",
        "calculadora" | "calc" if macos => "Calculator",
        "calculadora" | "calc" => "gnome-calculator",
        "paint" if windows => "mspaint.exe",
        "paint" => "kolourpaint",
        "cmd" | "terminal" if windows => "cmd.exe",
        "cmd" | "terminal" if macos => "Terminal",
        "cmd" | "terminal" => "x-terminal-emulator",
        "powershell" if windows => "powershell.exe",
        "powershell" => "pwsh",
        _ => return name.trim().to_string(),
    };
    resolved.to_string()
}

/// Only web URLs may be handed to the browser.
pub fn check_web_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Commands that change the host or start processes.
pub fn is_host_affecting(command: Command) -> bool {
    matches!(
        command,
        Command::CreateFolder | Command::OpenProgram | Command::RunSystemCommand
    )
}

/// Whether a plan must go through the typed-CONFIRMO gate.
pub fn requires_detailed_confirmation(plan: &Plan, safe_mode: bool) -> bool {
    !safe_mode && plan.steps.iter().any(|s| is_host_affecting(s.command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Step;

    #[test]
    fn test_allow_list() {
        assert!(resolve_safe_command("date").is_some());
        assert!(resolve_safe_command(" HOSTNAME ").is_some());
        assert!(resolve_safe_command("rm -rf /").is_none());
        assert!(resolve_safe_command("date; rm -rf ~").is_none());
        assert!(resolve_safe_command("ls").is_none());
    }

    #[test]
    fn test_program_aliases() {
        assert_ne!(resolve_program("Calculadora"), "Calculadora");
        assert_eq!(resolve_program("firefox"), "firefox");
    }

    #[test]
    fn test_web_urls_only() {
        assert!(check_web_url("https://www.youtube.com").is_some());
        assert!(check_web_url("http://example.org/a?b=c").is_some());
        assert!(check_web_url("file:///etc/passwd").is_none());
        assert!(check_web_url("javascript:alert(1)").is_none());
        assert!(check_web_url("not a url").is_none());
    }

    #[test]
    fn test_detailed_confirmation_policy() {
        let risky = Plan::new("x", vec![Step::with(Command::CreateFolder, "/tmp/a")]);
        let harmless = Plan::new("x", vec![Step::new(Command::GetTime)]);
        assert!(requires_detailed_confirmation(&risky, false));
        assert!(!requires_detailed_confirmation(&risky, true));
        assert!(!requires_detailed_confirmation(&harmless, false));
    }
}
