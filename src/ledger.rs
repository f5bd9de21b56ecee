//! Interaction ledger: one JSON line per turn in a per-day file, plus a
//! rolling `analytics.json` of aggregate counters.

use crate::config::HistoryConfig;
use crate::error::LedgerError;
use crate::types::{GeneratorKind, Modality, Outcome, Plan, ResponseModality};
use chrono::{DateTime, Days, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, warn};

const FILE_PREFIX: &str = "commands_";
const FILE_SUFFIX: &str = ".jsonl";
const ANALYTICS_FILE: &str = "analytics.json";
const MAX_TEXT_CHARS: usize = 500;
const RECENT_INPUT_CHARS: usize = 50;
pub const PRIVATE_MARKER: &str = "[PRIVATE]";

/// One finished turn, as handed to the ledger.
#[derive(Debug, Clone)]
pub struct Interaction<'a> {
    pub input: &'a str,
    pub plan: &'a Plan,
    pub outcome: Outcome,
    pub input_method: Modality,
    pub response_method: ResponseModality,
    pub safe_mode: bool,
    pub generator: GeneratorKind,
}

/// One line of a daily file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Local>,
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_hash: Option<String>,
    pub input_method: Modality,
    pub explanation: String,
    pub steps_count: usize,
    pub steps: Vec<String>,
    pub outcome: Outcome,
    pub response_method: ResponseModality,
    pub safe_mode: bool,
    pub generator: GeneratorKind,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyRate {
    pub total: u64,
    pub success: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Analytics {
    pub total_interactions: u64,
    pub last_updated: Option<DateTime<Local>>,
    pub command_frequency: BTreeMap<String, u64>,
    pub input_method_stats: BTreeMap<String, u64>,
    pub hourly_usage: BTreeMap<String, u64>,
    pub daily_success_rates: BTreeMap<String, DailyRate>,
}

impl Analytics {
    fn add(&mut self, record: &InteractionRecord, now: DateTime<Local>) {
        self.total_interactions += 1;
        self.last_updated = Some(now);
        *self
            .command_frequency
            .entry(record.explanation.to_lowercase())
            .or_default() += 1;
        *self
            .input_method_stats
            .entry(record.input_method.as_str().to_string())
            .or_default() += 1;
        *self
            .hourly_usage
            .entry(record.timestamp.hour().to_string())
            .or_default() += 1;
        let day = self
            .daily_success_rates
            .entry(record.timestamp.format("%Y-%m-%d").to_string())
            .or_default();
        day.total += 1;
        if record.outcome == Outcome::Success {
            day.success += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TodayStats {
    pub total: usize,
    pub voice: usize,
    pub text: usize,
    pub successful: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentEntry {
    pub time: String,
    pub input: String,
    pub method: Modality,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsagePatterns {
    pub top_commands: Vec<(String, u64)>,
    pub input_methods: BTreeMap<String, u64>,
    pub hourly_usage: BTreeMap<String, u64>,
    pub success_trend: Vec<(String, DailyRate)>,
    pub total_interactions: u64,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    enabled: bool,
    dir: PathBuf,
    max_history_days: u32,
    privacy_mode: bool,
}

/// Collapses whitespace and caps length, so every record stays one line.
pub fn sanitize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_TEXT_CHARS {
        let mut cut: String = collapsed.chars().take(MAX_TEXT_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        collapsed
    }
}

/// First 16 hex chars of the SHA-256 of `text`.
pub fn privacy_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(16);
    hex
}

fn day_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", FILE_PREFIX, date.format("%Y%m%d"), FILE_SUFFIX)
}

fn parse_day_file_name(name: &str) -> Option<NaiveDate> {
    let stamp = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

impl Ledger {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            enabled: config.enabled,
            dir: config.resolved_dir(),
            max_history_days: config.max_history_days,
            privacy_mode: config.privacy_mode,
        }
    }

    /// Builds the ledger, creates its directory and prunes expired days.
    /// Failures are logged; the ledger is still usable afterwards.
    pub fn open(config: &HistoryConfig) -> Self {
        let ledger = Self::new(config);
        if !ledger.enabled {
            debug!("history disabled");
            return ledger;
        }
        if let Err(e) = fs::create_dir_all(&ledger.dir) {
            error!("failed to create history dir {}: {}", ledger.dir.display(), e);
            return ledger;
        }
        match ledger.prune(Local::now()) {
            Ok(0) => {}
            Ok(n) => debug!("pruned {} expired history files", n),
            Err(e) => warn!("history pruning failed: {}", e),
        }
        ledger
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn analytics_path(&self) -> PathBuf {
        self.dir.join(ANALYTICS_FILE)
    }

    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(day_file_name(date))
    }

    /// Never fails; a broken ledger must not break the conversation.
    pub fn record(&self, interaction: &Interaction<'_>) {
        if let Err(e) = self.try_record(interaction) {
            error!("failed to record interaction: {}", e);
        }
    }

    pub fn try_record(&self, interaction: &Interaction<'_>) -> Result<(), LedgerError> {
        self.record_at(interaction, Local::now())
    }

    pub fn record_at(&self, interaction: &Interaction<'_>, now: DateTime<Local>) -> Result<(), LedgerError> {
        if !self.enabled {
            return Ok(());
        }

        let record = self.build_record(interaction, now);
        fs::create_dir_all(&self.dir).map_err(|e| LedgerError::io(&self.dir, e))?;

        let path = self.day_path(now.date_naive());
        let line = serde_json::to_string(&record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LedgerError::io(&path, e))?;
        writeln!(file, "{}", line).map_err(|e| LedgerError::io(&path, e))?;

        let mut analytics = self.analytics();
        analytics.add(&record, now);
        self.save_analytics(&analytics)?;

        debug!("recorded interaction: {}", record.outcome);
        Ok(())
    }

    fn build_record(&self, interaction: &Interaction<'_>, now: DateTime<Local>) -> InteractionRecord {
        let (user_input, user_input_hash) = if self.privacy_mode {
            (PRIVATE_MARKER.to_string(), Some(privacy_hash(interaction.input)))
        } else {
            (sanitize(interaction.input), None)
        };

        InteractionRecord {
            timestamp: now,
            user_input,
            user_input_hash,
            input_method: interaction.input_method,
            explanation: sanitize(&interaction.plan.explanation),
            steps_count: interaction.plan.steps.len(),
            steps: interaction.plan.step_strings(),
            outcome: interaction.outcome,
            response_method: interaction.response_method,
            safe_mode: interaction.safe_mode,
            generator: interaction.generator,
        }
    }

    /// Current aggregate counters; a missing or corrupt file reads as empty.
    pub fn analytics(&self) -> Analytics {
        let path = self.analytics_path();
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("ignoring corrupt analytics at {}: {}", path.display(), e);
                Analytics::default()
            }),
            Err(_) => Analytics::default(),
        }
    }

    fn save_analytics(&self, analytics: &Analytics) -> Result<(), LedgerError> {
        let path = self.analytics_path();
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(analytics)?;
        fs::write(&tmp, text).map_err(|e| LedgerError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| LedgerError::io(&path, e))?;
        Ok(())
    }

    /// Records of one day, oldest first. Unreadable lines are skipped.
    pub fn records_on(&self, date: NaiveDate) -> Vec<InteractionRecord> {
        if !self.enabled {
            return Vec::new();
        }
        let path = self.day_path(date);
        let Ok(file) = fs::File::open(&path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(&line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("skipping bad history line in {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }

    pub fn today_stats(&self) -> TodayStats {
        self.stats_on(Local::now().date_naive())
    }

    pub fn stats_on(&self, date: NaiveDate) -> TodayStats {
        let records = self.records_on(date);
        let total = records.len();
        let voice = records
            .iter()
            .filter(|r| r.input_method == Modality::Voice)
            .count();
        let successful = records
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count();
        TodayStats {
            total,
            voice,
            text: total - voice,
            successful,
            success_rate: if total > 0 {
                successful as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    /// Today's last `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RecentEntry> {
        self.recent_on(Local::now().date_naive(), limit)
    }

    pub fn recent_on(&self, date: NaiveDate, limit: usize) -> Vec<RecentEntry> {
        self.records_on(date)
            .into_iter()
            .rev()
            .take(limit)
            .map(|r| RecentEntry {
                time: r.timestamp.format("%H:%M").to_string(),
                input: shorten(&r.user_input, RECENT_INPUT_CHARS),
                method: r.input_method,
                outcome: r.outcome,
            })
            .collect()
    }

    pub fn usage_patterns(&self) -> UsagePatterns {
        if !self.enabled {
            return UsagePatterns::default();
        }
        let analytics = self.analytics();

        let mut top_commands: Vec<(String, u64)> = analytics.command_frequency.into_iter().collect();
        top_commands.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_commands.truncate(5);

        let days = analytics.daily_success_rates.len();
        let success_trend = analytics
            .daily_success_rates
            .into_iter()
            .skip(days.saturating_sub(7))
            .collect();

        UsagePatterns {
            top_commands,
            input_methods: analytics.input_method_stats,
            hourly_usage: analytics.hourly_usage,
            success_trend,
            total_interactions: analytics.total_interactions,
        }
    }

    pub fn report(&self) -> String {
        if !self.enabled {
            return "Histórico desabilitado.".to_string();
        }

        let now = Local::now();
        let today = self.stats_on(now.date_naive());
        let patterns = self.usage_patterns();
        let recent = self.recent_on(now.date_naive(), 5);

        let mut out = Vec::new();
        out.push(format!("Relatório Sol - {}", now.format("%d/%m/%Y %H:%M")));
        out.push(String::new());
        out.push("Hoje:".to_string());
        out.push(format!("  Total de comandos: {}", today.total));
        out.push(format!("  Por voz: {}", today.voice));
        out.push(format!("  Por texto: {}", today.text));
        out.push(format!("  Execuções bem-sucedidas: {}", today.successful));
        out.push(format!("  Taxa de sucesso: {:.1}%", today.success_rate));
        out.push(String::new());
        out.push("Geral:".to_string());
        out.push(format!("  Interações registradas: {}", patterns.total_interactions));
        out.push(format!("  Método preferido: {}", preferred_method(&patterns.input_methods)));
        if !patterns.top_commands.is_empty() {
            out.push("  Pedidos mais frequentes:".to_string());
            for (explanation, count) in &patterns.top_commands {
                out.push(format!("    {}x {}", count, shorten(explanation, RECENT_INPUT_CHARS)));
            }
        }
        out.push(String::new());
        out.push("Recentes:".to_string());
        if recent.is_empty() {
            out.push("  (nenhum comando registrado hoje)".to_string());
        }
        for entry in &recent {
            out.push(format!(
                "  [{}] {} {} - {}",
                entry.outcome,
                entry.method.as_str(),
                entry.time,
                entry.input
            ));
        }
        out.push(String::new());
        out.push(format!("Histórico em: {}", self.dir.display()));
        out.join("\n")
    }

    /// Deletes day files whose embedded date is more than
    /// `max_history_days` before `now`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Local>) -> Result<usize, LedgerError> {
        if !self.enabled || !self.dir.exists() {
            return Ok(0);
        }
        // A retention window reaching past the calendar's start keeps everything.
        let Some(cutoff) = now
            .date_naive()
            .checked_sub_days(Days::new(u64::from(self.max_history_days)))
        else {
            debug!("retention of {} days keeps every file", self.max_history_days);
            return Ok(0);
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(|e| LedgerError::io(&self.dir, e))? {
            let entry = entry.map_err(|e| LedgerError::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(date) = parse_day_file_name(&name) else {
                continue;
            };
            if date < cutoff {
                let path = entry.path();
                fs::remove_file(&path).map_err(|e| LedgerError::io(&path, e))?;
                debug!("removed expired history file {}", name);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn preferred_method(stats: &BTreeMap<String, u64>) -> String {
    match stats.iter().max_by_key(|(_, count)| **count) {
        Some((method, count)) => {
            let label = if method == "voice" { "voz" } else { "texto" };
            format!("{} ({} usos)", label, count)
        }
        None => "não definido".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Command, Step};
    use chrono::TimeZone;

    fn ledger_in(dir: &Path, privacy_mode: bool) -> Ledger {
        Ledger::new(&HistoryConfig {
            enabled: true,
            dir: Some(dir.to_path_buf()),
            max_history_days: 30,
            privacy_mode,
        })
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 15, 0).unwrap()
    }

    fn interaction<'a>(input: &'a str, plan: &'a Plan, outcome: Outcome) -> Interaction<'a> {
        Interaction {
            input,
            plan,
            outcome,
            input_method: Modality::Text,
            response_method: ResponseModality::Text,
            safe_mode: true,
            generator: GeneratorKind::Keyword,
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  abre \n\t o   youtube "), "abre o youtube");
        let long = "a".repeat(600);
        let cut = sanitize(&long);
        assert_eq!(cut.chars().count(), 500);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_privacy_hash_is_16_hex() {
        let h = privacy_hash("que horas são?");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, privacy_hash("que horas são?"));
    }

    #[test]
    fn test_record_writes_line_and_analytics() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), false);
        let plan = Plan::new("Abrindo o YouTube", vec![Step::new(Command::OpenBrowser)]);
        let now = at(2024, 3, 9, 14);

        ledger
            .record_at(&interaction("abre o YouTube", &plan, Outcome::Success), now)
            .unwrap();
        ledger
            .record_at(&interaction("abre o YouTube", &plan, Outcome::Cancelled), now)
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert!(dir.path().join("commands_20240309.jsonl").exists());
        let records = ledger.records_on(day);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].steps, vec!["abrir_navegador"]);
        assert_eq!(records[0].user_input, "abre o YouTube");
        assert_eq!(records[1].outcome, Outcome::Cancelled);

        let analytics = ledger.analytics();
        assert_eq!(analytics.total_interactions, 2);
        assert_eq!(analytics.command_frequency["abrindo o youtube"], 2);
        assert_eq!(analytics.input_method_stats["text"], 2);
        assert_eq!(analytics.hourly_usage["14"], 2);
        assert_eq!(
            analytics.daily_success_rates["2024-03-09"],
            DailyRate { total: 2, success: 1 }
        );

        let stats = ledger.stats_on(day);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.successful, 1);
        assert!((stats.success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_privacy_mode_never_stores_raw_input() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), true);
        let plan = Plan::info("x");
        let now = at(2024, 3, 9, 10);
        ledger
            .record_at(&interaction("minha senha é 1234", &plan, Outcome::InfoOnly), now)
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("commands_20240309.jsonl")).unwrap();
        assert!(!raw.contains("1234"));
        let record = &ledger.records_on(now.date_naive())[0];
        assert_eq!(record.user_input, PRIVATE_MARKER);
        assert_eq!(record.user_input_hash.as_deref(), Some(privacy_hash("minha senha é 1234").as_str()));
    }

    #[test]
    fn test_recent_is_newest_first_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), false);
        let plan = Plan::info("x");
        let long = "b".repeat(80);
        ledger
            .record_at(&interaction("primeiro", &plan, Outcome::InfoOnly), at(2024, 3, 9, 9))
            .unwrap();
        ledger
            .record_at(&interaction(&long, &plan, Outcome::InfoOnly), at(2024, 3, 9, 10))
            .unwrap();

        let recent = ledger.recent_on(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].time, "10:15");
        assert_eq!(recent[0].input.chars().count(), 53);
        assert_eq!(recent[1].input, "primeiro");
    }

    #[test]
    fn test_prune_by_embedded_date() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), false);
        for name in [
            "commands_20240101.jsonl",
            "commands_20240305.jsonl",
            "commands_garbage.jsonl",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let removed = ledger.prune(at(2024, 3, 9, 12)).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("commands_20240101.jsonl").exists());
        assert!(dir.path().join("commands_20240305.jsonl").exists());
        assert!(dir.path().join("commands_garbage.jsonl").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("commands_20000101.jsonl"), "").unwrap();
        let config = HistoryConfig {
            enabled: true,
            dir: Some(dir.path().to_path_buf()),
            max_history_days: 200_000_000,
            privacy_mode: false,
        };
        let ledger = Ledger::open(&config);
        assert_eq!(ledger.prune(at(2024, 3, 9, 12)).unwrap(), 0);
        assert!(dir.path().join("commands_20000101.jsonl").exists());
    }

    #[test]
    fn test_disabled_ledger_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("history");
        let ledger = Ledger::new(&HistoryConfig {
            enabled: false,
            dir: Some(target.clone()),
            ..Default::default()
        });
        let plan = Plan::info("x");
        ledger.record(&interaction("oi", &plan, Outcome::InfoOnly));
        assert!(!target.exists());
        assert_eq!(ledger.today_stats(), TodayStats::default());
        assert!(ledger.recent(3).is_empty());
    }

    #[test]
    fn test_usage_patterns_top_five_and_last_week() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), false);
        for day in 1..=9 {
            let plan = Plan::info(format!("pedido {}", day % 6));
            ledger
                .record_at(&interaction("x", &plan, Outcome::InfoOnly), at(2024, 3, day, 8))
                .unwrap();
        }
        let patterns = ledger.usage_patterns();
        assert_eq!(patterns.total_interactions, 9);
        assert_eq!(patterns.top_commands.len(), 5);
        assert_eq!(patterns.success_trend.len(), 7);
        assert_eq!(patterns.success_trend[6].0, "2024-03-09");
    }

    #[test]
    fn test_corrupt_analytics_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path(), false);
        fs::write(ledger.analytics_path(), "{not json").unwrap();
        let plan = Plan::info("x");
        ledger
            .record_at(&interaction("oi", &plan, Outcome::InfoOnly), at(2024, 3, 9, 8))
            .unwrap();
        assert_eq!(ledger.analytics().total_interactions, 1);
    }
}
