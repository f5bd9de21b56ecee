use crate::config::{save_config, Config};
use crate::confirm::{confirm, confirm_detailed, CONFIRM_TOKEN};
use crate::executor::Executor;
use crate::host::Host;
use crate::ledger::{Interaction, Ledger};
use crate::llm::OpenAiClient;
use crate::mode::ModeSwitch;
use crate::planner::PlanGenerator;
use crate::safety::requires_detailed_confirmation;
use crate::types::{Modality, Outcome, ResponseModality};
use crate::ui::{print_banner, print_help, print_plan, Console, Silent, Speaker};
use std::{fs, path::PathBuf};
use tracing::{debug, error, info, warn};

const FAREWELL: &str = "Até mais! Foi um prazer ajudar você!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Reserved console words, matched case-insensitively on the whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    Exit,
    Status,
    Mode,
    History,
    Help,
    Doctor,
}

pub fn reserved_word(input: &str) -> Option<Reserved> {
    match input.trim().to_lowercase().as_str() {
        "sair" | "exit" | "quit" | "tchau" | "bye" => Some(Reserved::Exit),
        "status" | "config" => Some(Reserved::Status),
        "modo" => Some(Reserved::Mode),
        "historico" | "histórico" | "stats" | "relatorio" => Some(Reserved::History),
        "ajuda" | "help" => Some(Reserved::Help),
        "diagnostico" | "doctor" => Some(Reserved::Doctor),
        _ => None,
    }
}

/// One interactive conversation: owns the mode switch, the generator, the
/// executor and the ledger, and runs turns strictly one after another.
pub struct Session<H: Host> {
    config: Config,
    config_path: PathBuf,
    generator: Box<dyn PlanGenerator>,
    executor: Executor<H>,
    ledger: Ledger,
    mode: ModeSwitch,
    speaker: Box<dyn Speaker>,
    persist_config: bool,
}

impl<H: Host> Session<H> {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        host: H,
        generator: Box<dyn PlanGenerator>,
        ledger: Ledger,
    ) -> Self {
        let mode = ModeSwitch::new(config.safe_mode);
        let executor = Executor::new(host, mode.reader());
        Self {
            config,
            config_path,
            generator,
            executor,
            ledger,
            mode,
            speaker: Box::new(Silent),
            persist_config: true,
        }
    }

    /// With `false`, mode changes stay in memory and the config file is
    /// never written. Used when the file on disk could not be read.
    pub fn with_config_persistence(mut self, persist: bool) -> Self {
        self.persist_config = persist;
        self
    }

    pub fn with_speaker(mut self, speaker: Box<dyn Speaker>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn is_safe(&self) -> bool {
        self.mode.is_safe()
    }

    pub fn executor(&self) -> &Executor<H> {
        &self.executor
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Reads lines until an exit word or end of input.
    pub fn run(&mut self, console: &mut dyn Console) {
        print_banner(console, self.is_safe(), self.config.llm.is_configured());

        loop {
            let line = match console.read_line("\nVocê: ") {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.say(console, FAREWELL);
                    break;
                }
                Err(e) => {
                    error!("failed to read input: {}", e);
                    self.say(console, FAREWELL);
                    break;
                }
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if let Some(word) = reserved_word(input) {
                if self.handle_reserved(word, console) == Flow::Stop {
                    break;
                }
                continue;
            }

            self.handle_turn(input, Modality::Text, console);
        }
    }

    fn handle_reserved(&mut self, word: Reserved, console: &mut dyn Console) -> Flow {
        debug!("reserved word: {:?}", word);
        match word {
            Reserved::Exit => {
                self.say(console, FAREWELL);
                return Flow::Stop;
            }
            Reserved::Status => self.print_status(console),
            Reserved::Mode => self.toggle_mode(console),
            Reserved::History => self.print_history(console),
            Reserved::Help => print_help(console),
            Reserved::Doctor => self.doctor(console),
        }
        Flow::Continue
    }

    /// Runs one request through generate, present, confirm, execute and
    /// record. Every path ends with exactly one ledger entry.
    pub fn handle_turn(&mut self, text: &str, modality: Modality, console: &mut dyn Console) -> Outcome {
        // Mode is fixed for the turn.
        let safe_mode = self.mode.is_safe();
        let generated = self.generator.generate(text);
        let plan = &generated.plan;
        info!("plan from {}: {} steps", generated.source.as_str(), plan.steps.len());

        let spoke = self.say(console, &plan.explanation);

        let outcome = if plan.is_informational() {
            Outcome::InfoOnly
        } else {
            print_plan(console, plan);
            let confirmed = if requires_detailed_confirmation(plan, safe_mode) {
                confirm_detailed(console, &plan.steps)
            } else {
                confirm(console)
            };

            if confirmed {
                console.say("Perfeito! Executando agora...");
                let summary = self.executor.execute(&plan.steps, console);
                if summary.all_succeeded() {
                    console.say("Pronto! Tarefa concluída.");
                } else {
                    console.say(&format!(
                        "Concluído com {} passo(s) sem sucesso.",
                        summary.failed + summary.unknown
                    ));
                }
                Outcome::Success
            } else {
                console.say("Tudo bem, não executei nada.");
                Outcome::Cancelled
            }
        };

        self.ledger.record(&Interaction {
            input: text,
            plan,
            outcome,
            input_method: modality,
            response_method: if spoke {
                ResponseModality::Both
            } else {
                ResponseModality::Text
            },
            safe_mode,
            generator: generated.source,
        });

        debug!("turn finished: {}", outcome);
        outcome
    }

    /// Shows the message and, when a voice is available, speaks it too.
    fn say(&mut self, console: &mut dyn Console, message: &str) -> bool {
        console.say(message);
        self.speaker.is_available() && self.speaker.speak(message)
    }

    fn toggle_mode(&mut self, console: &mut dyn Console) {
        let currently_safe = self.mode.is_safe();
        let want_safe = if currently_safe {
            console.print("ATENÇÃO: o modo de execução REAL age no seu sistema.");
            let answer = console
                .read_line("   Tem certeza? (digite 'CONFIRMO' para ativar): ")
                .unwrap_or_else(|e| {
                    warn!("failed to read mode confirmation: {}", e);
                    None
                });
            if answer.as_deref().map(str::trim) == Some(CONFIRM_TOKEN) {
                false
            } else {
                console.print("Mantendo o modo seguro ativo.");
                true
            }
        } else {
            true
        };

        if want_safe == currently_safe {
            return;
        }

        self.mode.set_safe(want_safe);
        self.config.safe_mode = want_safe;
        if want_safe {
            console.print("Modo seguro ATIVADO: ações serão apenas simuladas.");
        } else {
            console.print("Modo de execução REAL ativado.");
        }
        info!("safe mode set to {}", want_safe);

        if !self.persist_config {
            warn!(
                "not writing {}: it could not be read at startup",
                self.config_path.display()
            );
            console.print("Não foi possível salvar a configuração; a mudança vale só nesta sessão.");
            return;
        }

        if let Err(e) = save_config(&self.config, &self.config_path) {
            error!("failed to persist mode change: {}", e);
            console.print("Não foi possível salvar a configuração; a mudança vale só nesta sessão.");
        }
    }

    fn print_status(&self, console: &mut dyn Console) {
        let on_off = |b: bool| if b { "ATIVO" } else { "DESATIVADO" };
        console.print("");
        console.print("Status da Sol:");
        console.print(&format!(
            "  Modo: {}",
            if self.is_safe() {
                "SEGURO (simulação)"
            } else {
                "EXECUÇÃO REAL"
            }
        ));
        console.print(&format!(
            "  IA: {}",
            if self.config.llm.is_configured() {
                format!("configurada ({})", self.config.llm.model)
            } else {
                "modo demonstração".to_string()
            }
        ));
        console.print(&format!("  Debug: {}", on_off(self.config.debug_mode)));
        console.print(&format!(
            "  Voz: {}",
            if self.speaker.is_available() {
                "disponível"
            } else {
                "indisponível"
            }
        ));
        if self.ledger.is_enabled() {
            console.print(&format!("  Histórico: {}", self.ledger.dir().display()));
        } else {
            console.print("  Histórico: desabilitado");
        }
        console.print(&format!("  Config: {}", self.config_path.display()));
    }

    fn print_history(&self, console: &mut dyn Console) {
        if !self.ledger.is_enabled() {
            console.print("Histórico desabilitado na configuração.");
            return;
        }

        console.print("");
        for line in self.ledger.report().lines() {
            console.print(line);
        }

        let today = self.ledger.today_stats();
        console.print("");
        console.print("Resumo rápido:");
        console.print(&format!("  Comandos hoje: {}", today.total));
        console.print(&format!("  Taxa de sucesso: {:.1}%", today.success_rate));

        let recent = self.ledger.recent(3);
        if !recent.is_empty() {
            console.print("Últimos comandos:");
            for entry in recent {
                console.print(&format!(
                    "  [{}] {} {} - {}",
                    entry.outcome,
                    entry.method.as_str(),
                    entry.time,
                    entry.input
                ));
            }
        }
    }

    fn doctor(&self, console: &mut dyn Console) {
        console.print("");
        console.print("diagnóstico:");

        if self.config.llm.is_configured() {
            let reachable = OpenAiClient::new(&self.config.llm)
                .map(|c| c.is_available())
                .unwrap_or(false);
            if reachable {
                console.print(&format!("  ia ({}) ... ok", self.config.llm.endpoint));
            } else {
                console.print(&format!("  ia ({}) ... falhou", self.config.llm.endpoint));
                console.print("    usando planejamento por palavras-chave");
            }
        } else {
            console.print("  ia ... não configurada (modo demonstração)");
            console.print(&format!("    defina llm.api_key em {}", self.config_path.display()));
        }

        if !self.ledger.is_enabled() {
            console.print("  histórico ... desabilitado");
        } else {
            let dir = self.ledger.dir();
            let marker = dir.join(".sol-doctor");
            let writable = fs::create_dir_all(dir)
                .and_then(|_| fs::write(&marker, b"ok"))
                .and_then(|_| fs::remove_file(&marker))
                .is_ok();
            if writable {
                console.print("  histórico ... ok");
            } else {
                console.print("  histórico ... sem permissão de escrita");
                console.print(&format!("    dir: {}", dir.display()));
            }
        }

        if self.config_path.exists() {
            console.print("  config ... ok");
        } else {
            console.print("  config ... usando padrões");
        }
    }
}
