use crate::config::Config;
use crate::error::LlmError;
use crate::grammar::{usage, Command, Step, GRAMMAR};
use crate::llm::{OpenAiClient, ReasoningClient};
use crate::types::{GeneratedPlan, GeneratorKind, Plan, RawPlan};
use crate::validator;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const YOUTUBE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_VIDEO_QUERY: &str = "lofi hip hop";
pub const DEFAULT_PROGRAM: &str = "notepad";
const DEMO_FOLDER: &str = "SolAgent_Exemplo";

pub trait PlanGenerator {
    /// Total: always yields a plan.
    fn generate(&self, text: &str) -> GeneratedPlan;
}

/// Keyword categories, in the order they are tried. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Sensitive,
    Time,
    Date,
    Video,
    Search,
    Files,
    Program,
    System,
    Unknown,
}

const RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Sensitive,
        &[
            "localização",
            "localizacao",
            "rastrear",
            "senha",
            "privacidade",
            "credencia",
            "meu ip",
            "endereço ip",
            "endereco ip",
        ],
    ),
    (Intent::Time, &["hora"]),
    (Intent::Date, &["data", "dia", "hoje"]),
    (Intent::Video, &["youtube", "vídeo", "video", "música", "musica"]),
    (Intent::Search, &["google", "pesquisar", "buscar", "procurar"]),
    (Intent::Files, &["pasta", "arquivo", "explorador"]),
    (Intent::Program, &["abrir", "abre", "programa", "app"]),
    (
        Intent::System,
        &["sistema", "computador", "pc", "informações", "informacoes"],
    ),
];

const MEDIA_WORDS: &[&str] = &["vídeo", "video", "música", "musica"];
const CREATE_WORDS: &[&str] = &["cria"];

/// Keywords match at the start of a word, so `senha` finds "senhas" but
/// not "desenhar".
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| contains_word(haystack, w))
}

pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, words)| contains_any(&lower, words))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Unknown)
}

/// Deterministic planner. Never calls out; never fails.
#[derive(Debug, Clone)]
pub struct KeywordPlanner {
    demo_folder: PathBuf,
}

impl Default for KeywordPlanner {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            demo_folder: base.join(DEMO_FOLDER),
        }
    }
}

impl KeywordPlanner {
    pub fn with_demo_folder(demo_folder: impl Into<PathBuf>) -> Self {
        Self {
            demo_folder: demo_folder.into(),
        }
    }

    pub fn plan(&self, text: &str) -> Plan {
        let lower = text.to_lowercase();
        let intent = classify(text);
        debug!("keyword intent: {:?}", intent);

        match intent {
            Intent::Sensitive => Plan::info(
                "Por questões de segurança e privacidade, não posso acessar essas informações. \
                 Posso ajudar com navegação web, arquivos básicos e informações do sistema.",
            ),
            Intent::Time => Plan::new(
                "Vou mostrar o horário atual do sistema.",
                vec![Step::new(Command::GetTime)],
            ),
            Intent::Date => Plan::new(
                "Vou mostrar a data atual do sistema.",
                vec![Step::new(Command::GetDate)],
            ),
            Intent::Video => {
                let mut steps = vec![
                    Step::new(Command::OpenBrowser),
                    Step::with(Command::OpenUrl, YOUTUBE_URL),
                ];
                if contains_any(&lower, MEDIA_WORDS) {
                    steps.push(Step::with(Command::SearchVideo, DEFAULT_VIDEO_QUERY));
                    Plan::new("Vou abrir o YouTube e buscar conteúdo para você.", steps)
                } else {
                    Plan::new("Vou abrir o YouTube no seu navegador.", steps)
                }
            }
            Intent::Search => Plan::new(
                "Vou fazer uma pesquisa no Google.",
                vec![
                    Step::new(Command::OpenBrowser),
                    Step::with(Command::SearchWeb, text.trim()),
                ],
            ),
            Intent::Files => {
                let mut steps = vec![Step::new(Command::OpenFileExplorer)];
                if contains_any(&lower, CREATE_WORDS) {
                    steps.push(Step::with(
                        Command::CreateFolder,
                        self.demo_folder.to_string_lossy(),
                    ));
                    Plan::new(
                        "Vou abrir o explorador de arquivos e criar uma pasta de exemplo.",
                        steps,
                    )
                } else {
                    Plan::new("Vou abrir o explorador de arquivos.", steps)
                }
            }
            Intent::Program => Plan::new(
                "Vou abrir um programa para você.",
                vec![Step::with(Command::OpenProgram, DEFAULT_PROGRAM)],
            ),
            Intent::System => Plan::new(
                "Vou mostrar informações do seu sistema.",
                vec![Step::new(Command::SystemStatus)],
            ),
            Intent::Unknown => Plan::info(
                "Ainda não sei fazer isso em modo demonstração. Posso abrir sites, pesquisar, \
                 mostrar data, hora e informações do sistema. Configure uma chave da OpenAI \
                 para pedidos mais livres.",
            ),
        }
    }
}

impl PlanGenerator for KeywordPlanner {
    fn generate(&self, text: &str) -> GeneratedPlan {
        GeneratedPlan {
            plan: self.plan(text),
            source: GeneratorKind::Keyword,
        }
    }
}

pub fn build_system_prompt() -> String {
    let commands = GRAMMAR
        .iter()
        .map(|e| format!("- {}  ({})", usage(e), e.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Você é a Sol, uma assistente que converte pedidos em planos de ação.

REGRAS:
1. Nunca execute nada; gere apenas um plano que será confirmado por um humano.
2. Use SOMENTE os comandos abaixo, exatamente como escritos.
3. Comandos com parâmetro usam o formato comando:valor.
4. Para pedidos impossíveis, perigosos ou sobre dados pessoais, deixe "steps" vazio e explique.

COMANDOS:
{commands}

EXEMPLOS:
"que horas são?" -> {{"explanation": "Vou verificar o horário atual do sistema", "steps": ["obter_hora_atual"]}}
"abre o YouTube" -> {{"explanation": "Vou abrir o YouTube no seu navegador", "steps": ["abrir_navegador", "abrir_url:https://www.youtube.com"]}}
"procura vídeos de receitas" -> {{"explanation": "Vou pesquisar vídeos de receitas no YouTube", "steps": ["pesquisar_no_youtube:receitas"]}}
"você pode rastrear minha localização?" -> {{"explanation": "Não rastreio localizações por questões de privacidade", "steps": []}}

Responda APENAS com este JSON, sem nenhum outro texto:
{{"explanation": "...", "steps": ["..."]}}"#,
        commands = commands
    )
}

/// Pulls the first `{...}` object out of a reply and validates it.
pub fn parse_plan(response: &str) -> Result<RawPlan, LlmError> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    let json_str = match (start, end) {
        (Some(s), Some(e)) if e > s => &response[s..=e],
        _ => response,
    };

    let parsed: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| LlmError::InvalidJson(e.to_string()))?;

    validator::parse_value(parsed).ok_or(LlmError::InvalidPlan)
}

/// Asks the reasoning service first; anything short of a valid plan falls
/// back to the keyword planner.
pub struct LlmPlanner<C: ReasoningClient> {
    client: C,
    system_prompt: String,
    fallback: KeywordPlanner,
}

impl<C: ReasoningClient> LlmPlanner<C> {
    pub fn new(client: C, fallback: KeywordPlanner) -> Self {
        Self {
            client,
            system_prompt: build_system_prompt(),
            fallback,
        }
    }

    fn try_generate(&self, text: &str) -> Result<Plan, LlmError> {
        let reply = self.client.complete(&self.system_prompt, text)?;
        debug!("reasoning reply: {}", reply);
        let raw = parse_plan(&reply)?;
        Plan::try_from(raw).map_err(|_| LlmError::InvalidPlan)
    }
}

impl<C: ReasoningClient> PlanGenerator for LlmPlanner<C> {
    fn generate(&self, text: &str) -> GeneratedPlan {
        match self.try_generate(text) {
            Ok(plan) => {
                info!("plan from reasoning service: {} step(s)", plan.steps.len());
                GeneratedPlan {
                    plan,
                    source: GeneratorKind::Openai,
                }
            }
            Err(e) => {
                warn!("reasoning service unusable ({}), using keyword fallback", e);
                self.fallback.generate(text)
            }
        }
    }
}

pub fn build_generator(config: &Config) -> Box<dyn PlanGenerator> {
    if !config.llm.is_configured() {
        debug!("no reasoning credential configured, using keyword planner");
        return Box::new(KeywordPlanner::default());
    }
    match OpenAiClient::new(&config.llm) {
        Ok(client) => Box::new(LlmPlanner::new(client, KeywordPlanner::default())),
        Err(e) => {
            warn!("could not set up reasoning client ({}), using keyword planner", e);
            Box::new(KeywordPlanner::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeReasoningClient;

    fn keyword() -> KeywordPlanner {
        KeywordPlanner::with_demo_folder("/tmp/SolAgent_Exemplo")
    }

    fn steps(plan: &Plan) -> Vec<String> {
        plan.step_strings()
    }

    #[test]
    fn test_time_question() {
        let plan = keyword().plan("que horas são?");
        assert_eq!(steps(&plan), vec!["obter_hora_atual"]);
        assert!(plan.explanation.contains("horário"));
    }

    #[test]
    fn test_open_youtube_is_exactly_two_steps() {
        let plan = keyword().plan("abre o YouTube");
        assert_eq!(
            steps(&plan),
            vec!["abrir_navegador", "abrir_url:https://www.youtube.com"]
        );
    }

    #[test]
    fn test_music_request_adds_default_search() {
        let plan = keyword().plan("quero ouvir música");
        assert_eq!(
            steps(&plan),
            vec![
                "abrir_navegador",
                "abrir_url:https://www.youtube.com",
                "pesquisar_no_youtube:lofi hip hop"
            ]
        );
    }

    #[test]
    fn test_search_uses_entire_input() {
        let plan = keyword().plan("pesquisar receitas de bolo");
        assert_eq!(
            steps(&plan),
            vec!["abrir_navegador", "pesquisar_google:pesquisar receitas de bolo"]
        );
    }

    #[test]
    fn test_time_beats_date() {
        assert_eq!(classify("que horas são hoje?"), Intent::Time);
        assert_eq!(classify("que dia é hoje?"), Intent::Date);
    }

    #[test]
    fn test_sensitive_wins_over_everything() {
        for input in [
            "qual é a minha senha do google?",
            "abre o youtube e mostra minha localização",
            "que horas são? e rastrear meu celular",
        ] {
            let plan = keyword().plan(input);
            assert!(plan.steps.is_empty(), "{input}");
            assert!(!plan.explanation.is_empty());
        }
    }

    #[test]
    fn test_keywords_match_at_word_start() {
        assert_eq!(classify("abre o programa de desenhar"), Intent::Program);
        assert_eq!(classify("esqueci minhas senhas"), Intent::Sensitive);
        assert_eq!(classify("(senha) do wifi"), Intent::Sensitive);
        assert!(contains_word("vídeos de gatos", "vídeo"));
        assert!(!contains_word("desenhar", "senha"));
    }

    #[test]
    fn test_unknown_is_informational() {
        let plan = keyword().plan("conte uma piada");
        assert!(plan.is_informational());
        assert!(!plan.explanation.is_empty());
    }

    #[test]
    fn test_files_and_create() {
        assert_eq!(steps(&keyword().plan("abre o explorador")), vec!["abrir_explorador_arquivos"]);
        assert_eq!(
            steps(&keyword().plan("cria uma pasta")),
            vec![
                "abrir_explorador_arquivos",
                "criar_pasta:/tmp/SolAgent_Exemplo"
            ]
        );
    }

    #[test]
    fn test_program_and_system() {
        assert_eq!(steps(&keyword().plan("abrir o programa")), vec!["abrir_programa:notepad"]);
        assert_eq!(steps(&keyword().plan("status do computador")), vec!["mostrar_status_sistema"]);
    }

    #[test]
    fn test_prompt_lists_every_command() {
        let prompt = build_system_prompt();
        for entry in GRAMMAR {
            assert!(prompt.contains(entry.name));
        }
    }

    #[test]
    fn test_parse_plan_tolerates_fences() {
        let reply = "```json\n{\"explanation\": \"Vou ver a data\", \"steps\": [\"obter_data_atual\"]}\n```";
        let raw = parse_plan(reply).unwrap();
        assert_eq!(raw.steps, vec!["obter_data_atual".to_string()]);
    }

    #[test]
    fn test_llm_plan_is_used_when_valid() {
        let client = FakeReasoningClient::replying(
            r#"{"explanation": "Vou listar", "steps": ["listar_arquivos:/tmp"]}"#,
        );
        let planner = LlmPlanner::new(client, keyword());
        let generated = planner.generate("lista os arquivos de /tmp");
        assert_eq!(generated.source, GeneratorKind::Openai);
        assert_eq!(steps(&generated.plan), vec!["listar_arquivos:/tmp"]);
    }

    #[test]
    fn test_llm_failures_fall_back() {
        let replies = [
            Err(LlmError::Timeout(20)),
            Ok("não sei".to_string()),
            Ok(r#"{"explicacao": "x", "passos": []}"#.to_string()),
            Ok(r#"{"explanation": "x", "steps": ["teleportar:lua"]}"#.to_string()),
        ];
        for reply in replies {
            let planner = LlmPlanner::new(FakeReasoningClient::new(vec![reply]), keyword());
            let generated = planner.generate("que horas são?");
            assert_eq!(generated.source, GeneratorKind::Keyword);
            assert_eq!(steps(&generated.plan), vec!["obter_hora_atual"]);
        }
    }

    #[test]
    fn test_build_generator_without_key_is_keyword() {
        let generated = build_generator(&Config::default()).generate("que horas são?");
        assert_eq!(generated.source, GeneratorKind::Keyword);
    }
}
