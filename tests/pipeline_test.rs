use sol::commands::Session;
use sol::config::{Config, HistoryConfig};
use sol::error::LlmError;
use sol::grammar::{Command, Step};
use sol::host::RecordingHost;
use sol::ledger::Ledger;
use sol::llm::FakeReasoningClient;
use sol::planner::{KeywordPlanner, LlmPlanner, PlanGenerator};
use sol::types::{GeneratorKind, Modality, Outcome};
use sol::ui::ScriptedConsole;
use std::path::Path;

fn config_in(dir: &Path, safe_mode: bool) -> Config {
    Config {
        safe_mode,
        history: HistoryConfig {
            dir: Some(dir.join("history")),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn session_with(dir: &Path, safe_mode: bool, generator: Box<dyn PlanGenerator>) -> Session<RecordingHost> {
    let config = config_in(dir, safe_mode);
    let ledger = Ledger::new(&config.history);
    Session::new(config, dir.join("config.toml"), RecordingHost::default(), generator, ledger)
}

fn keyword(dir: &Path) -> Box<dyn PlanGenerator> {
    Box::new(KeywordPlanner::with_demo_folder(dir.join("SolAgent_Exemplo")))
}

#[test]
fn time_question_without_credential_runs_and_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(dir.path(), true, keyword(dir.path()));
    let mut console = ScriptedConsole::new(["s"]);

    let outcome = session.handle_turn("que horas são?", Modality::Text, &mut console);

    assert_eq!(outcome, Outcome::Success);
    assert!(console.printed.contains(&"  1. obter_hora_atual".to_string()));
    assert!(console.said.iter().any(|s| s.starts_with("Agora são")));

    let recent = session.ledger().recent(1);
    assert_eq!(recent[0].outcome, Outcome::Success);
    assert_eq!(recent[0].input, "que horas são?");
}

#[test]
fn youtube_in_safe_mode_simulates_both_steps() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(dir.path(), true, keyword(dir.path()));
    let mut console = ScriptedConsole::new(["sim"]);

    let outcome = session.handle_turn("abre o YouTube", Modality::Text, &mut console);

    assert_eq!(outcome, Outcome::Success);
    assert!(session.executor().host().calls().is_empty());
    let simulated = console
        .said
        .iter()
        .filter(|s| s.starts_with("(modo seguro)"))
        .count();
    assert_eq!(simulated, 2);
}

#[test]
fn refusal_is_info_only_and_never_asks() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(dir.path(), false, keyword(dir.path()));
    let mut console = ScriptedConsole::default();

    let outcome = session.handle_turn(
        "você pode rastrear minha localização?",
        Modality::Voice,
        &mut console,
    );

    assert_eq!(outcome, Outcome::InfoOnly);
    assert!(console.said[0].contains("privacidade"));
    assert!(!console.transcript().contains("Posso executar"));
    assert_eq!(session.ledger().today_stats().voice, 1);
}

#[test]
fn reasoning_plan_is_used_when_valid() {
    let dir = tempfile::tempdir().unwrap();
    let reply = r#"Claro! {"explanation": "Vou mostrar a data", "steps": ["obter_data_atual"]}"#;
    let planner = LlmPlanner::new(
        FakeReasoningClient::replying(reply),
        KeywordPlanner::with_demo_folder(dir.path()),
    );
    let generated = planner.generate("qual é a data?");
    assert_eq!(generated.source, GeneratorKind::Openai);
    assert_eq!(generated.plan.steps, vec![Step::new(Command::GetDate)]);
}

#[test]
fn unknown_command_from_reasoning_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let reply = r#"{"explanation": "teleporte", "steps": ["teleportar:lua"]}"#;
    let planner = LlmPlanner::new(
        FakeReasoningClient::replying(reply),
        KeywordPlanner::with_demo_folder(dir.path()),
    );
    let generated = planner.generate("que horas são?");
    assert_eq!(generated.source, GeneratorKind::Keyword);
    assert_eq!(generated.plan.steps, vec![Step::new(Command::GetTime)]);
}

#[test]
fn service_timeout_falls_back_and_turn_completes() {
    let dir = tempfile::tempdir().unwrap();
    let planner = LlmPlanner::new(
        FakeReasoningClient::failing(LlmError::Timeout(20)),
        KeywordPlanner::with_demo_folder(dir.path()),
    );
    let mut session = session_with(dir.path(), true, Box::new(planner));
    let mut console = ScriptedConsole::new(["n"]);

    let outcome = session.handle_turn("abre o YouTube", Modality::Text, &mut console);

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(console.said.iter().any(|s| s.contains("não executei nada")));
}

#[test]
fn whole_conversation_over_scripted_console() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(dir.path(), true, keyword(dir.path()));
    let mut console = ScriptedConsole::new([
        "",
        "ajuda",
        "que dia é hoje?",
        "s",
        "status",
        "historico",
        "tchau",
        "never read",
    ]);

    session.run(&mut console);

    let transcript = console.transcript();
    assert!(transcript.contains("pesquisar_no_youtube:TERMO"));
    assert!(transcript.contains("Hoje é"));
    assert!(transcript.contains("SEGURO"));
    assert!(transcript.contains("Comandos hoje: 1"));
    assert!(console.said.last().unwrap().starts_with("Até mais"));
}
