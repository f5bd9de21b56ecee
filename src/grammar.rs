//! The fixed set of commands a plan may contain.
//!
//! Every step in a plan is either a bare command name or `name:parameter`.
//! `Step::parse` is the only place a step string becomes a typed value;
//! everything downstream matches on [`Command`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenBrowser,
    OpenUrl,
    SearchVideo,
    SearchWeb,
    OpenFileExplorer,
    CreateFolder,
    OpenProgram,
    ListFiles,
    GetDate,
    GetTime,
    SystemStatus,
    RunSystemCommand,
    SpeakToUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarEntry {
    pub command: Command,
    pub name: &'static str,
    pub takes_parameter: bool,
    /// Placeholder shown in prompts and help, e.g. `URL`.
    pub parameter_hint: &'static str,
    pub description: &'static str,
}

pub const GRAMMAR: &[GrammarEntry] = &[
    GrammarEntry {
        command: Command::OpenBrowser,
        name: "abrir_navegador",
        takes_parameter: false,
        parameter_hint: "",
        description: "Abre o navegador padrão",
    },
    GrammarEntry {
        command: Command::OpenUrl,
        name: "abrir_url",
        takes_parameter: true,
        parameter_hint: "URL",
        description: "Abre uma URL específica",
    },
    GrammarEntry {
        command: Command::SearchVideo,
        name: "pesquisar_no_youtube",
        takes_parameter: true,
        parameter_hint: "TERMO",
        description: "Pesquisa no YouTube",
    },
    GrammarEntry {
        command: Command::SearchWeb,
        name: "pesquisar_google",
        takes_parameter: true,
        parameter_hint: "TERMO",
        description: "Pesquisa no Google",
    },
    GrammarEntry {
        command: Command::OpenFileExplorer,
        name: "abrir_explorador_arquivos",
        takes_parameter: false,
        parameter_hint: "",
        description: "Abre o explorador de arquivos",
    },
    GrammarEntry {
        command: Command::CreateFolder,
        name: "criar_pasta",
        takes_parameter: true,
        parameter_hint: "CAMINHO",
        description: "Cria uma nova pasta",
    },
    GrammarEntry {
        command: Command::OpenProgram,
        name: "abrir_programa",
        takes_parameter: true,
        parameter_hint: "NOME",
        description: "Abre um programa/aplicativo",
    },
    GrammarEntry {
        command: Command::ListFiles,
        name: "listar_arquivos",
        takes_parameter: true,
        parameter_hint: "CAMINHO",
        description: "Lista arquivos de um diretório",
    },
    GrammarEntry {
        command: Command::GetDate,
        name: "obter_data_atual",
        takes_parameter: false,
        parameter_hint: "",
        description: "Mostra a data atual",
    },
    GrammarEntry {
        command: Command::GetTime,
        name: "obter_hora_atual",
        takes_parameter: false,
        parameter_hint: "",
        description: "Mostra a hora atual",
    },
    GrammarEntry {
        command: Command::SystemStatus,
        name: "mostrar_status_sistema",
        takes_parameter: false,
        parameter_hint: "",
        description: "Informações do sistema",
    },
    GrammarEntry {
        command: Command::RunSystemCommand,
        name: "executar_comando",
        takes_parameter: true,
        parameter_hint: "COMANDO_SEGURO",
        description: "Executa um comando seguro do sistema",
    },
    GrammarEntry {
        command: Command::SpeakToUser,
        name: "falar_para_usuario",
        takes_parameter: true,
        parameter_hint: "MENSAGEM",
        description: "Envia uma mensagem ao usuário",
    },
];

// Row `i` of the table must belong to the command whose index is `i`;
// checked at compile time.
const _: () = {
    let mut i = 0;
    while i < GRAMMAR.len() {
        assert!(GRAMMAR[i].command.index() == i);
        i += 1;
    }
};

impl Command {
    /// Position of this command's row in [`GRAMMAR`].
    const fn index(self) -> usize {
        match self {
            Command::OpenBrowser => 0,
            Command::OpenUrl => 1,
            Command::SearchVideo => 2,
            Command::SearchWeb => 3,
            Command::OpenFileExplorer => 4,
            Command::CreateFolder => 5,
            Command::OpenProgram => 6,
            Command::ListFiles => 7,
            Command::GetDate => 8,
            Command::GetTime => 9,
            Command::SystemStatus => 10,
            Command::RunSystemCommand => 11,
            Command::SpeakToUser => 12,
        }
    }

    pub fn entry(self) -> &'static GrammarEntry {
        &GRAMMAR[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn takes_parameter(self) -> bool {
        self.entry().takes_parameter
    }
}

pub fn lookup(name: &str) -> Option<&'static GrammarEntry> {
    GRAMMAR.iter().find(|e| e.name == name)
}

/// Rendering used by prompts and `ajuda`: `abrir_url:URL`.
pub fn usage(entry: &GrammarEntry) -> String {
    if entry.takes_parameter {
        format!("{}:{}", entry.name, entry.parameter_hint)
    } else {
        entry.name.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: Command,
    pub parameter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{0} takes no parameter")]
    UnexpectedParameter(&'static str),

    #[error("{0} requires a parameter")]
    MissingParameter(&'static str),
}

impl Step {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            parameter: None,
        }
    }

    pub fn with(command: Command, parameter: impl Into<String>) -> Self {
        Self {
            command,
            parameter: Some(parameter.into()),
        }
    }

    /// Splits on the first colon only; the parameter is opaque.
    pub fn parse(raw: &str) -> Result<Self, StepError> {
        match raw.split_once(':') {
            None => {
                let entry = lookup(raw).ok_or_else(|| StepError::Unknown(raw.to_string()))?;
                if entry.takes_parameter {
                    return Err(StepError::MissingParameter(entry.name));
                }
                Ok(Step::new(entry.command))
            }
            Some((name, param)) => {
                let entry = lookup(name).ok_or_else(|| StepError::Unknown(name.to_string()))?;
                if !entry.takes_parameter {
                    return Err(StepError::UnexpectedParameter(entry.name));
                }
                Ok(Step::with(entry.command, param))
            }
        }
    }

    pub fn parameter(&self) -> &str {
        self.parameter.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(p) => write!(f, "{}:{}", self.command.name(), p),
            None => f.write_str(self.command.name()),
        }
    }
}
