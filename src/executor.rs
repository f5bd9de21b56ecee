//! Runs confirmed plans one step at a time. A failing step is reported and
//! counted; it never stops the rest of the plan.

use crate::error::ActionError;
use crate::grammar::{Command, Step};
use crate::host::Host;
use crate::mode::ModeReader;
use crate::safety::{check_web_url, resolve_program, resolve_safe_command, SAFE_COMMANDS};
use crate::ui::{format_gb, Console};
use chrono::Local;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const MAX_LISTED_ENTRIES: usize = 10;
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

const YOUTUBE_SEARCH: &str = "https://www.youtube.com/results";
const GOOGLE_SEARCH: &str = "https://www.google.com/search";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl ExecutionSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.unknown == 0
    }
}

pub struct Executor<H: Host> {
    host: H,
    mode: ModeReader,
    command_timeout: Duration,
}

impl<H: Host> Executor<H> {
    pub fn new(host: H, mode: ModeReader) -> Self {
        Self {
            host,
            mode,
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn execute(&self, steps: &[Step], console: &mut dyn Console) -> ExecutionSummary {
        let raw: Vec<Result<Step, String>> = steps.iter().cloned().map(Ok).collect();
        self.run(&raw, console)
    }

    /// Like [`execute`](Self::execute), for steps that have not been parsed
    /// yet. Unknown commands are reported and skipped.
    pub fn execute_raw(&self, steps: &[String], console: &mut dyn Console) -> ExecutionSummary {
        let parsed: Vec<Result<Step, String>> = steps
            .iter()
            .map(|raw| {
                Step::parse(raw).map_err(|e| {
                    debug!("unparseable step {:?}: {}", raw, e);
                    raw.clone()
                })
            })
            .collect();
        self.run(&parsed, console)
    }

    fn run(&self, steps: &[Result<Step, String>], console: &mut dyn Console) -> ExecutionSummary {
        // The mode is read once; a plan never runs half simulated.
        let safe = self.mode.is_safe();
        let total = steps.len();
        let mut summary = ExecutionSummary {
            total,
            ..Default::default()
        };

        for (i, step) in steps.iter().enumerate() {
            info!("Passo {}/{}", i + 1, total);
            let step = match step {
                Ok(step) => step,
                Err(raw) => {
                    warn!("unknown command: {}", raw);
                    console.say(&format!("Não sei como executar: {}", raw));
                    summary.unknown += 1;
                    continue;
                }
            };

            match self.dispatch(step, safe, console) {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!("step '{}' failed: {}", step, e);
                    console.say(&format!("Erro ao executar '{}': {}", step, e));
                    summary.failed += 1;
                }
            }
        }

        debug!("execution summary: {:?}", summary);
        summary
    }

    fn dispatch(&self, step: &Step, safe: bool, console: &mut dyn Console) -> Result<(), ActionError> {
        match step.command {
            Command::OpenBrowser => {
                if safe {
                    return simulate(console, "abrir o navegador padrão");
                }
                self.host.open_url("about:blank")?;
                console.say("Abrindo o navegador.");
                Ok(())
            }
            Command::OpenUrl => {
                let raw = required(step)?;
                let url = check_web_url(raw).ok_or_else(|| ActionError::BadUrl(raw.to_string()))?;
                self.browse(console, safe, &url, &format!("Abrindo {}", url))
            }
            Command::SearchVideo => {
                let term = required(step)?;
                let url = search_url(YOUTUBE_SEARCH, "search_query", term)?;
                self.browse(console, safe, &url, &format!("Pesquisando '{}' no YouTube.", term))
            }
            Command::SearchWeb => {
                let term = required(step)?;
                let url = search_url(GOOGLE_SEARCH, "q", term)?;
                self.browse(console, safe, &url, &format!("Pesquisando '{}' no Google.", term))
            }
            Command::OpenFileExplorer => {
                if safe {
                    return simulate(console, "abrir o explorador de arquivos");
                }
                self.host.open_file_explorer()?;
                console.say("Abrindo o explorador de arquivos.");
                Ok(())
            }
            Command::CreateFolder => {
                let path = expand_home(required(step)?);
                if safe {
                    return simulate(console, &format!("criar a pasta {}", path.display()));
                }
                self.host.create_dir_all(&path)?;
                info!("created {}", path.display());
                console.say(&format!("Pasta pronta: {}", path.display()));
                Ok(())
            }
            Command::OpenProgram => {
                let name = required(step)?;
                let program = resolve_program(name);
                if safe {
                    return simulate(console, &format!("abrir o programa {}", program));
                }
                self.host.spawn_program(&program)?;
                console.say(&format!("Abrindo {}.", program));
                Ok(())
            }
            Command::ListFiles => {
                let path = expand_home(required(step)?);
                if safe {
                    return simulate(console, &format!("listar os arquivos de {}", path.display()));
                }
                self.list_files(console, path)
            }
            Command::GetDate => {
                let today = Local::now().format("%d/%m/%Y").to_string();
                info!("date: {}", today);
                console.say(&format!("Hoje é {}.", today));
                Ok(())
            }
            Command::GetTime => {
                let now = Local::now().format("%H:%M:%S").to_string();
                info!("time: {}", now);
                console.say(&format!("Agora são {}.", now));
                Ok(())
            }
            Command::SystemStatus => {
                self.system_status(console);
                Ok(())
            }
            Command::RunSystemCommand => {
                let alias = required(step)?;
                let argv = resolve_safe_command(alias).ok_or_else(|| {
                    console.say(&format!(
                        "Comando não permitido. Disponíveis: {}",
                        SAFE_COMMANDS.join(", ")
                    ));
                    ActionError::NotAllowed(alias.to_string())
                })?;
                if safe {
                    return simulate(console, &format!("executar '{}'", argv.join(" ")));
                }
                let output = self.host.run_command(&argv, self.command_timeout)?;
                if !output.success {
                    warn!("'{}' exited with failure: {}", alias, output.stderr.trim());
                }
                let text = output.stdout.trim();
                if text.is_empty() {
                    console.say(&format!("'{}' não produziu saída.", alias));
                } else {
                    console.say(&format!("Resultado de '{}':", alias));
                    for line in text.lines() {
                        console.print(&format!("   {}", line));
                    }
                }
                Ok(())
            }
            Command::SpeakToUser => {
                console.say(step.parameter());
                Ok(())
            }
        }
    }

    fn browse(&self, console: &mut dyn Console, safe: bool, url: &Url, message: &str) -> Result<(), ActionError> {
        if safe {
            return simulate(console, &format!("abrir {}", url));
        }
        self.host.open_url(url.as_str())?;
        console.say(message);
        Ok(())
    }

    fn list_files(&self, console: &mut dyn Console, path: PathBuf) -> Result<(), ActionError> {
        let entries = self.host.list_dir(&path)?;
        if entries.is_empty() {
            console.say(&format!("{} está vazia.", path.display()));
            return Ok(());
        }

        console.say(&format!("{} itens em {}:", entries.len(), path.display()));
        for entry in entries.iter().take(MAX_LISTED_ENTRIES) {
            let marker = if entry.is_dir { "[pasta]" } else { "       " };
            console.print(&format!("   {} {}", marker, entry.name));
        }
        if entries.len() > MAX_LISTED_ENTRIES {
            console.print(&format!("   ... e mais {} itens", entries.len() - MAX_LISTED_ENTRIES));
        }
        Ok(())
    }

    fn system_status(&self, console: &mut dyn Console) {
        let info = self.host.system_info();
        console.say("Status do sistema:");
        console.print(&format!("   Sistema: {}", info.os));
        console.print(&format!("   CPU: {}", info.cpu));
        match info.memory {
            Some(mem) => console.print(&format!(
                "   Memória: {} livres de {}",
                format_gb(mem.available),
                format_gb(mem.total)
            )),
            None => debug!("memory information unavailable"),
        }
        match info.disk {
            Some(disk) => console.print(&format!(
                "   Disco: {} livres de {}",
                format_gb(disk.available),
                format_gb(disk.total)
            )),
            None => debug!("disk information unavailable"),
        }
    }
}

fn simulate(console: &mut dyn Console, action: &str) -> Result<(), ActionError> {
    info!("safe mode, not performed: {}", action);
    console.say(&format!("(modo seguro) Eu iria {}.", action));
    Ok(())
}

fn required(step: &Step) -> Result<&str, ActionError> {
    let param = step.parameter().trim();
    if param.is_empty() {
        return Err(ActionError::MissingParameter(step.command.name()));
    }
    Ok(param)
}

fn search_url(base: &str, key: &str, term: &str) -> Result<Url, ActionError> {
    Url::parse_with_params(base, &[(key, term)]).map_err(|_| ActionError::BadUrl(base.to_string()))
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/").or_else(|| (raw == "~").then_some("")) {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        },
        None => PathBuf::from(raw),
    }
}
