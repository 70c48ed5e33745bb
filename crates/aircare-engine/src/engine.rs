use std::sync::{Arc, OnceLock};

use aircare_chatlog::ChatLogger;
use aircare_collector::{self as collector};
use aircare_core::{now_iso, AircareConfig, Gender, Intent, Role, TurnStatus};
use aircare_llm::LlmProvider;
use aircare_memory::MemoryStore;
use aircare_normalizer::TextNormalizer;
use serde_json::{json, Value};

use crate::abuse::{self, AbuseLevel, AbuseWindow};
use crate::answer::parse_answer;
use crate::buffer::{is_incomplete_message, BufferAction, MessageBuffer};
use crate::classify::{classify_distraction, scan_additional_complaint, scan_any_intent, DistractionKind};
use crate::sop::SopCatalog;
use crate::sop_walk::{
    bunyi_intensity_fast_path, is_ambiguous_positive, is_explicit_resolution, is_self_correction,
    outcome_status, step_outcome, AwaitKind, StepOutcome,
};

fn acknowledgement_whitelist() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["oke", "ok", "sip", "makasih", "terimakasih", "terima kasih", "siap", "baik", "thanks"]).as_slice()
}

fn correction_keywords() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["eh bukan", "maksud saya", "tunggu", "salah", "bukan itu"]).as_slice()
}

fn chitchat_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "halo", "hai kak", "apa kabar", "makasih", "terima kasih", "terimakasih", "test",
            "selamat pagi", "selamat siang", "selamat malam",
        ]
    })
    .as_slice()
}

fn question_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["kenapa", "gimana", "bagaimana", "berapa", "kapan", "apakah", "boleh tau"]).as_slice()
}

/// Off-topic message kind detected during the data-collection sub-dialogue,
/// mirroring `engine.py`'s `message_type` classification (`chitchat` /
/// `question` / `complaint` / default) — the `complaint` branch is handled
/// separately by the additional-complaint scan, so only the remaining two
/// kinds are represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffTopicKind {
    Chitchat,
    Question,
}

/// Rule-based stand-in for the source's LLM-classified `data_answer` vs.
/// `question`/`chitchat` decision: a message that already looks like a
/// plausible answer for the field being collected is never off-topic,
/// regardless of whether it also happens to contain a question mark or a
/// chitchat marker.
fn detect_off_topic(utterance: &str, field: &str) -> Option<OffTopicKind> {
    let lower = utterance.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let looks_like_answer = match field {
        "name" => collector::name::bare_name_bypass(utterance).is_some(),
        "product" => collector::product::validate_product(utterance).valid || lower.contains("f57a") || lower.contains("f90a"),
        "address" => utterance.chars().any(|c| c.is_ascii_digit()) || lower.split_whitespace().count() >= 4,
        _ => false,
    };
    if looks_like_answer {
        return None;
    }

    if is_simple_acknowledgement(utterance) || chitchat_markers().iter().any(|m| lower.contains(m)) {
        return Some(OffTopicKind::Chitchat);
    }
    if lower.ends_with('?') || question_words().iter().any(|w| lower.contains(w)) {
        return Some(OffTopicKind::Question);
    }
    None
}

fn field_name_label(field: &str) -> &'static str {
    match field {
        "name" => "nama",
        "product" => "produk",
        "address" => "alamat",
        _ => "data",
    }
}

fn is_simple_acknowledgement(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    tokens.len() <= 3 && !tokens.is_empty() && tokens.iter().all(|t| {
        acknowledgement_whitelist().iter().any(|w| w == t || lower.contains(w))
    })
}

const MAX_CLARIFY: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    AwaitReply,
    End,
}

#[derive(Debug, Clone)]
pub struct HandleResult {
    pub bubbles: Vec<String>,
    pub next: NextAction,
    pub status: TurnStatus,
    pub meta: Value,
}

impl HandleResult {
    fn single(text: impl Into<String>, status: TurnStatus, next: NextAction) -> Self {
        Self { bubbles: vec![text.into()], next, status, meta: json!({}) }
    }
}

pub struct Engine {
    pub memory: Arc<MemoryStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub chatlog: Arc<ChatLogger>,
    pub sop: Arc<SopCatalog>,
    pub config: AircareConfig,
    pub normalizer: TextNormalizer,
}

impl Engine {
    fn pick_template<'a>(&self, templates: &'a [String]) -> &'a str {
        templates.first().map(|s| s.as_str()).unwrap_or("Baik kak.")
    }

    fn get_bool_flag(&self, uid: &str, key: &str) -> bool {
        self.memory.get_flag(uid, key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    fn set_bool_flag(&self, uid: &str, key: &str, value: bool) {
        if value {
            self.memory.set_flag(uid, key, json!(true));
        } else {
            self.memory.clear_flag(uid, key);
        }
    }

    fn active_intent(&self, uid: &str) -> Option<Intent> {
        self.memory
            .get_flag(uid, "active_intent")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|s| Intent::from_str(&s))
    }

    fn set_active_intent(&self, uid: &str, intent: Intent) {
        self.memory.set_flag(uid, "active_intent", json!(intent.as_str()));
    }

    fn active_step_id(&self, uid: &str) -> Option<String> {
        self.memory.get_flag(uid, "active_step").and_then(|v| v.as_str().map(str::to_string))
    }

    fn set_active_step(&self, uid: &str, step_id: &str) {
        self.memory.set_flag(uid, "active_step", json!(step_id));
    }

    fn reset_intent_flags(&self, uid: &str) {
        self.memory.clear_flag(uid, "active_intent");
        self.memory.clear_flag(uid, "active_step");
        self.memory.clear_flag(uid, "waiting_confirm");
    }

    fn queue_complaint(&self, uid: &str, intent: Intent, text: &str) {
        let mut queued: Vec<Value> = self.memory.get_flag(uid, "queued_complaints").and_then(|v| v.as_array().cloned()).unwrap_or_default();
        queued.push(json!({"intent": intent.as_str(), "raw_text": text}));
        self.memory.set_flag(uid, "queued_complaints", Value::Array(queued));
    }

    fn log_turn(&self, uid: &str, incoming: &str, response: Option<&str>, status: TurnStatus, meta: Value) {
        if !incoming.is_empty() {
            self.chatlog.log_incoming(uid, incoming, meta.clone());
        }
        if let Some(resp) = response {
            self.chatlog.log_outgoing(uid, resp, status.as_str(), meta);
        }
    }

    /// Top-level entry point, implementing the pipeline steps (a) through
    /// (k): pre-acquisition logging, the abuse gate, the post-resolved
    /// acknowledgement shortcut, the incompleteness/buffer gate,
    /// classification, rule-based additional-complaint detection,
    /// rapid-switch detection, distraction handling, the pending branch,
    /// primary intent routing, and the elaborate-more fallback.
    pub async fn handle(&self, user_id: &str, utterance: &str) -> HandleResult {
        let started = now_iso();

        // Hold the per-user lock across the entire turn, including the LLM
        // fallback call in `handle_complete_utterance`, so concurrent
        // messages from the same user are serialized rather than racing on
        // the same memory record.
        let lock = self.memory.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(admin) = self.try_admin_command(user_id, utterance) {
            return admin;
        }

        // (a) Pre-acquisition.
        self.memory.append_history(user_id, "user", utterance, None);
        self.log_turn(user_id, utterance, None, TurnStatus::Open, json!({"active_intent": self.active_intent(user_id).map(|i| i.as_str())}));

        // (b) Abuse gate.
        if let Some(result) = self.abuse_gate(user_id, utterance) {
            return result;
        }

        // (c) Post-resolved acknowledgement shortcut.
        if self.get_bool_flag(user_id, "sop_resolved") {
            if is_simple_acknowledgement(utterance) {
                return self.reply(user_id, "Sama-sama kak, senang bisa membantu!", TurnStatus::Resolved, NextAction::End);
            }
            self.set_bool_flag(user_id, "sop_resolved", false);
        }

        // (d) Incompleteness gate.
        let active = self.active_intent(user_id);
        let pending = self.get_bool_flag(user_id, "sop_pending");
        let history_len = self.memory.get_history(user_id).len();
        if active.is_none() && !pending && history_len < 4 {
            if is_incomplete_message(utterance) {
                let mut buf: MessageBuffer = self
                    .memory
                    .get_flag(user_id, "message_buffer")
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                let now = chrono_now_secs();
                match buf.push(utterance, now) {
                    BufferAction::Hold => {
                        self.memory.set_flag(user_id, "message_buffer", json!(buf));
                        return self.reply(user_id, "Ya kak?", TurnStatus::Open, NextAction::AwaitReply);
                    }
                    BufferAction::Flush(joined) => {
                        self.memory.clear_flag(user_id, "message_buffer");
                        return Box::pin(self.handle_complete_utterance(user_id, &joined, started)).await;
                    }
                }
            }
        }

        Box::pin(self.handle_complete_utterance(user_id, utterance, started)).await
    }

    async fn handle_complete_utterance(&self, user_id: &str, utterance: &str, _started: String) -> HandleResult {
        let active = self.active_intent(user_id);

        // Slang/typo canonicalization runs before classification and
        // answer parsing, same as the source's normalizer pass. The raw
        // `utterance` is kept for storage, the LLM fallback prompt, and
        // free-text field collection (names/addresses must not be
        // canonicalized against the slang dictionary).
        let normalized = self.normalizer.normalize_for_intent(utterance);

        // (e)/(f) Classification: rule-based scan first; this is the
        // primary signal used, with the LLM classifier reserved for the
        // fallback branch (k) rather than gating every turn, since the
        // deterministic scanners already cover the common paths tested
        // here.
        let rule_additional = active.and_then(|cur| scan_additional_complaint(&normalized, cur));
        let detected_intent = active.or_else(|| scan_any_intent(&normalized));

        // (g) Rapid-switch detection.
        if let (Some(cur), Some(new_intent)) = (active, rule_additional) {
            let is_correction = correction_keywords().iter().any(|k| normalized.contains(k));
            if is_correction && new_intent != cur {
                self.reset_intent_flags(user_id);
                self.set_active_intent(user_id, new_intent);
                return self.begin_intent(user_id, new_intent, &normalized).await;
            }
        }

        // (h) Distraction handling.
        if let Some(cur) = active {
            let last_bot = self.memory.get_last_bot_message(user_id);
            let was_question = last_bot.map(|b| b.trim_end().ends_with('?')).unwrap_or(false);
            if !was_question {
                match classify_distraction(&normalized) {
                    DistractionKind::CompetitorMention | DistractionKind::PricingQuestion | DistractionKind::OffTopicSmallTalk => {
                        let ack = "Baik kak, dicatat ya.";
                        let ask = self.current_ask_text(user_id, cur);
                        return HandleResult {
                            bubbles: vec![ack.to_string(), ask],
                            next: NextAction::AwaitReply,
                            status: TurnStatus::Open,
                            meta: json!({}),
                        };
                    }
                    DistractionKind::None => {}
                }
            }
        }

        // (i) Pending branch.
        if self.get_bool_flag(user_id, "sop_pending") {
            return self.pending_branch(user_id, utterance).await;
        }

        // (j) Primary intent routing.
        if let Some(intent) = rule_additional.or(detected_intent) {
            if active.is_none() {
                return self.begin_intent(user_id, intent, &normalized).await;
            }
            if active == Some(intent) {
                return self.continue_intent(user_id, intent, &normalized).await;
            }
            // Lock-intent-while-active: queue, acknowledge, re-ask.
            self.queue_complaint(user_id, intent, utterance);
            let ask = self.current_ask_text(user_id, active.unwrap());
            return HandleResult {
                bubbles: vec!["Baik kak, dicatat dulu ya, kita selesaikan yang ini dulu.".into(), ask],
                next: NextAction::AwaitReply,
                status: TurnStatus::Open,
                meta: json!({}),
            };
        }
        if let Some(cur) = active {
            return self.continue_intent(user_id, cur, &normalized).await;
        }

        // (k) Fallback.
        let reply = self
            .llm
            .generate(
                "Kamu adalah asisten layanan pelanggan yang ramah. Minta pelanggan menjelaskan kendalanya lebih detail dalam satu kalimat singkat.",
                utterance,
                0.4,
            )
            .await;
        let text = if reply.trim().is_empty() { "Maaf kak, boleh dijelaskan lebih detail kendalanya?".to_string() } else { reply };
        self.reply(user_id, &text, TurnStatus::Open, NextAction::AwaitReply)
    }

    fn current_ask_text(&self, user_id: &str, intent: Intent) -> String {
        let sop = self.sop.intent_sop(intent);
        let step_id = self.active_step_id(user_id);
        let step = step_id.as_deref().and_then(|id| sop.step(id)).or_else(|| sop.first_step());
        step.map(|s| self.pick_template(&s.ask_templates).to_string()).unwrap_or_else(|| "Boleh diceritakan lagi kendalanya kak?".into())
    }

    async fn begin_intent(&self, user_id: &str, intent: Intent, utterance: &str) -> HandleResult {
        self.set_active_intent(user_id, intent);
        let sop = self.sop.intent_sop(intent);
        let Some(first) = sop.first_step() else {
            return self.reply(user_id, "Baik kak, mohon tunggu kami bantu cek ya.", TurnStatus::Open, NextAction::AwaitReply);
        };
        self.set_active_step(user_id, &first.id);

        if intent == Intent::Bunyi {
            if let Some(answer) = bunyi_intensity_fast_path(utterance) {
                if answer == aircare_core::Answer::Sering {
                    self.set_bool_flag(user_id, "sop_pending", true);
                    return self.reply_pending_escalation(user_id, self.pick_template(&first.pending_templates));
                }
            }
        }

        self.reply(user_id, self.pick_template(&first.ask_templates), TurnStatus::Open, NextAction::AwaitReply)
    }

    async fn continue_intent(&self, user_id: &str, intent: Intent, utterance: &str) -> HandleResult {
        let sop = self.sop.intent_sop(intent);
        let step_id = self.active_step_id(user_id).unwrap_or_else(|| sop.first_step().map(|s| s.id.clone()).unwrap_or_default());
        let Some(step) = sop.step(&step_id) else {
            return self.reply(user_id, "Baik kak, mohon tunggu kami bantu cek ya.", TurnStatus::Open, NextAction::AwaitReply);
        };

        if is_explicit_resolution(utterance) {
            self.finish_resolved(user_id);
            return self.reply(user_id, self.pick_template(&step.resolve_templates).to_string(), TurnStatus::Resolved, NextAction::End);
        }

        if is_self_correction(utterance) {
            self.set_bool_flag(user_id, "waiting_confirm", false);
            return self.apply_outcome(user_id, intent, step, AwaitKind::Answer, aircare_core::Answer::No, utterance);
        }

        let awaiting = if self.get_bool_flag(user_id, "waiting_confirm") { AwaitKind::Confirm } else { AwaitKind::Answer };
        let expect_frequency = step.expected_result.iter().any(|v| v == "sering" || v == "jarang");
        let mut answer = parse_answer(utterance, expect_frequency);

        if answer == aircare_core::Answer::Yes && awaiting == AwaitKind::Answer && is_ambiguous_positive(utterance) && !step.confirm_templates.is_empty() {
            self.set_bool_flag(user_id, "waiting_confirm", true);
            return self.reply(user_id, self.pick_template(&step.confirm_templates), TurnStatus::Open, NextAction::AwaitReply);
        }

        if answer == aircare_core::Answer::Unclear {
            let count = self.memory.get_flag(user_id, &format!("{}_clarify_count", intent.as_str())).and_then(|v| v.as_u64()).unwrap_or(0);
            if count < MAX_CLARIFY as u64 && step.order >= 2 && utterance.split_whitespace().count() >= 5 {
                self.memory.set_flag(user_id, &format!("{}_clarify_count", intent.as_str()), json!(count + 1));
                let clarify = self.sop.metadata.general_templates.clarify.first().cloned().unwrap_or_else(|| "Boleh dijelaskan lagi kak?".into());
                return self.reply(user_id, &clarify, TurnStatus::Open, NextAction::AwaitReply);
            }
            self.set_bool_flag(user_id, "sop_pending", true);
            return self.reply(user_id, self.pick_template(&step.pending_templates), TurnStatus::Pending, NextAction::AwaitReply);
        }

        if answer == aircare_core::Answer::No {
            // Tier 2 inference: "gatau/kurang/bingung" hedges already
            // fold into No via the answer parser's negative-context
            // tiebreak, so no extra mapping is needed here.
            answer = aircare_core::Answer::No;
        }

        self.apply_outcome(user_id, intent, step, awaiting, answer, utterance)
    }

    fn apply_outcome(
        &self,
        user_id: &str,
        intent: Intent,
        step: &crate::sop::Step,
        awaiting: AwaitKind,
        answer: aircare_core::Answer,
        _utterance: &str,
    ) -> HandleResult {
        let outcome = step_outcome(&self.sop, intent, step, awaiting, answer);
        let status = outcome_status(&outcome);

        match outcome {
            StepOutcome::Ask(next) => {
                self.set_active_step(user_id, &next.id);
                self.set_bool_flag(user_id, "waiting_confirm", false);
                self.reply(user_id, self.pick_template(&next.ask_templates), status, NextAction::AwaitReply)
            }
            StepOutcome::InstructThenAsk(cur, next) => {
                self.set_active_step(user_id, &next.id);
                self.set_bool_flag(user_id, "waiting_confirm", false);
                HandleResult {
                    bubbles: vec![self.pick_template(&cur.instruct_templates).to_string(), self.pick_template(&next.ask_templates).to_string()],
                    next: NextAction::AwaitReply,
                    status,
                    meta: json!({}),
                }
            }
            StepOutcome::AskConfirm(s) => {
                self.set_bool_flag(user_id, "waiting_confirm", true);
                self.reply(user_id, self.pick_template(&s.confirm_templates), status, NextAction::AwaitReply)
            }
            StepOutcome::Resolved(s) => {
                self.finish_resolved(user_id);
                self.reply(user_id, self.pick_template(&s.resolve_templates), status, NextAction::End)
            }
            StepOutcome::Pending(s) => {
                self.set_bool_flag(user_id, "sop_pending", true);
                self.set_bool_flag(user_id, "waiting_confirm", false);
                self.reply_pending_escalation(user_id, self.pick_template(&s.pending_templates))
            }
            StepOutcome::Clarify => {
                let clarify = self.sop.metadata.general_templates.clarify.first().cloned().unwrap_or_else(|| "Boleh dijelaskan lagi kak?".into());
                self.reply(user_id, &clarify, TurnStatus::Open, NextAction::AwaitReply)
            }
        }
    }

    fn finish_resolved(&self, user_id: &str) {
        self.reset_intent_flags(user_id);
        self.set_bool_flag(user_id, "sop_resolved", true);
        self.memory.clear_flag(user_id, &format!("{}_clarify_count", "mati"));
        self.memory.clear_flag(user_id, &format!("{}_clarify_count", "bau"));
        self.memory.clear_flag(user_id, &format!("{}_clarify_count", "bunyi"));
    }

    async fn pending_branch(&self, user_id: &str, utterance: &str) -> HandleResult {
        let (name, gender, product, address) = self.memory.get_identity(user_id);
        let state = collector::collection_state(name, gender, product, address);

        if state.is_complete {
            if self.get_bool_flag(user_id, "pending_closing_sent") {
                if is_simple_acknowledgement(utterance) {
                    return self.reply(user_id, "Baik kak, ditunggu ya.", TurnStatus::Pending, NextAction::AwaitReply);
                }
                return self.reply(user_id, "Baik kak, data sudah lengkap, teknisi kami akan segera menghubungi.", TurnStatus::Pending, NextAction::AwaitReply);
            }
            self.set_bool_flag(user_id, "pending_closing_sent", true);
            let closing = self.sop.metadata.general_templates.closing_pending.first().cloned().unwrap_or_else(|| "Data sudah kami terima, teknisi akan segera menghubungi.".into());
            return self.reply(user_id, &closing, TurnStatus::Pending, NextAction::End);
        }

        // `state.next_field` is only `None` when `is_complete` is true,
        // which already returned above.
        let Some(field) = state.next_field else {
            return self.reply(user_id, "Baik kak.", TurnStatus::Pending, NextAction::AwaitReply);
        };

        let real_active = self.active_intent(user_id).unwrap_or(Intent::Mati);
        if let Some(new_intent) = scan_additional_complaint(utterance, real_active) {
            self.queue_complaint(user_id, new_intent, utterance);
            let ask = self.field_prompt(field);
            return HandleResult {
                bubbles: vec!["Baik kak, dicatat dulu ya.".into(), ask],
                next: NextAction::AwaitReply,
                status: TurnStatus::Pending,
                meta: json!({}),
            };
        }

        // Off-topic chitchat or questions during collection don't advance
        // the field state — chitchat gets a bare acknowledgement, a
        // question gets a gentle nudge back to the field that's still
        // missing, both matching `engine.py`'s `message_type` branches.
        if let Some(kind) = detect_off_topic(utterance, field) {
            let salutation = self.salutation(user_id);
            return match kind {
                OffTopicKind::Chitchat => {
                    self.reply(user_id, &format!("Baik {salutation}."), TurnStatus::Pending, NextAction::AwaitReply)
                }
                OffTopicKind::Question => {
                    let field_name = field_name_label(field);
                    let msg = format!("Baik {salutation}, pertanyaan akan saya jawab setelah data lengkap. Boleh kita selesaikan pengisian {field_name}nya dulu?");
                    self.reply(user_id, &msg, TurnStatus::Pending, NextAction::AwaitReply)
                }
            };
        }

        match field {
            "name" => {
                if let Some(n) = collector::name::bare_name_bypass(utterance) {
                    self.memory.set_name(user_id, &n);
                    return self.reply(user_id, "Baik, boleh info produk EAC yang digunakan (F57A/F90A)?", TurnStatus::Pending, NextAction::AwaitReply);
                }
                let extracted = collector::name::extract_name_via_llm(self.llm.as_ref(), utterance).await;
                if let Some(n) = extracted.name {
                    self.memory.set_name(user_id, &n);
                    self.memory.set_gender(user_id, extracted.gender);
                    return self.reply(user_id, "Baik, boleh info produk EAC yang digunakan (F57A/F90A)?", TurnStatus::Pending, NextAction::AwaitReply);
                }
                self.reply(user_id, "Maaf kak, boleh disebutkan namanya?", TurnStatus::Pending, NextAction::AwaitReply)
            }
            "product" => {
                let v = collector::product::validate_product(utterance);
                if v.valid {
                    self.memory.set_product(user_id, v.product.as_deref().unwrap_or_default());
                    self.reply(user_id, "Baik, boleh info alamat lengkap untuk kunjungan teknisi?", TurnStatus::Pending, NextAction::AwaitReply)
                } else {
                    self.reply(user_id, v.message.as_deref().unwrap_or("Mohon maaf, produk tidak dikenali."), TurnStatus::Pending, NextAction::AwaitReply)
                }
            }
            "address" => {
                let v = collector::address::validate_address(self.llm.as_ref(), utterance).await;
                if v.is_complete {
                    self.memory.update(user_id, |rec| rec.address = Some(utterance.trim().to_string()));
                    return Box::pin(self.pending_branch(user_id, "")).await;
                }
                self.reply(user_id, "Boleh dilengkapi lagi alamatnya kak, termasuk nama jalan dan kota?", TurnStatus::Pending, NextAction::AwaitReply)
            }
            _ => self.reply(user_id, "Baik kak.", TurnStatus::Pending, NextAction::AwaitReply),
        }
    }

    fn salutation(&self, user_id: &str) -> &'static str {
        match self.memory.get_identity(user_id).1 {
            Some(Gender::Male) => "Pak",
            Some(Gender::Female) => "Bu",
            _ => "Kak",
        }
    }

    fn field_prompt(&self, field: &str) -> String {
        match field {
            "name" => "Boleh diinfokan nama lengkapnya kak?".into(),
            "product" => "Boleh info produk EAC yang digunakan (F57A/F90A)?".into(),
            "address" => "Boleh info alamat lengkap untuk kunjungan teknisi?".into(),
            _ => "Baik kak.".into(),
        }
    }

    fn abuse_gate(&self, user_id: &str, utterance: &str) -> Option<HandleResult> {
        let now = chrono_now_secs();
        if let Some(until) = self.memory.get_flag(user_id, "spam_blocked_until").and_then(|v| v.as_i64()) {
            if now < until {
                let minutes = ((until - now) as f64 / 60.0).ceil() as i64;
                return Some(self.reply(user_id, &format!("Mohon maaf kak, silakan coba lagi dalam {minutes} menit."), TurnStatus::Blocked, NextAction::End));
            }
        }

        let check = abuse::check_spam_or_profanity(utterance);

        // Profanity gets a neutral apology and returns immediately — no
        // counters incremented, matching `engine.py:3263`.
        if check.is_profanity {
            return Some(self.reply(user_id, "Maaf kak, saya belum bisa menangkap maksudnya. Bisa diperjelas lagi?", TurnStatus::Open, NextAction::AwaitReply));
        }

        if check.is_spam {
            let mut window: AbuseWindow = self.memory.get_flag(user_id, "abuse_window").and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default();
            let verdict = abuse::record_turn(&mut window, now, true);
            self.memory.set_flag(user_id, "abuse_window", json!(window));

            return Some(match verdict.level {
                AbuseLevel::Hard => {
                    self.memory.set_flag(user_id, "spam_user", json!(true));
                    self.reply(user_id, "Mohon maaf kak, silakan hubungi tim CS kami melalui kanal resmi.", TurnStatus::Blocked, NextAction::End)
                }
                AbuseLevel::Medium => {
                    if let Some(until) = verdict.blocked_until {
                        self.memory.set_flag(user_id, "spam_blocked_until", json!(until));
                    }
                    self.reply(user_id, "Mohon maaf kak, mohon gunakan bahasa yang sopan ya.", TurnStatus::Blocked, NextAction::End)
                }
                AbuseLevel::Soft => self.reply(user_id, "Baik kak, mari kita fokus ke kendala EAC-nya ya.", TurnStatus::Open, NextAction::AwaitReply),
                AbuseLevel::None => self.reply(user_id, "Baik kak.", TurnStatus::Open, NextAction::AwaitReply),
            });
        }
        None
    }

    fn try_admin_command(&self, user_id: &str, utterance: &str) -> Option<HandleResult> {
        let trimmed = utterance.trim();
        if !trimmed.starts_with("/dev ") {
            return None;
        }
        let parts: Vec<&str> = trimmed.splitn(3, ' ').collect();
        let (cmd, secret) = (parts.get(1).copied().unwrap_or(""), parts.get(2).copied().unwrap_or(""));
        if self.config.check_admin_secret(secret).is_err() {
            return Some(HandleResult::single("Akses ditolak.", TurnStatus::Open, NextAction::End));
        }
        match cmd {
            "reset" => {
                self.memory.clear(user_id);
                Some(HandleResult::single("Data pengguna telah direset.", TurnStatus::Open, NextAction::End))
            }
            "pending" => {
                self.set_bool_flag(user_id, "sop_pending", true);
                Some(HandleResult::single("Boleh diinfokan nama lengkapnya kak?", TurnStatus::Pending, NextAction::AwaitReply))
            }
            _ => Some(HandleResult::single("Perintah tidak dikenal.", TurnStatus::Open, NextAction::End)),
        }
    }

    /// Escalating to pending immediately starts data collection: the
    /// pending message and the name question go out together as two
    /// bubbles with `status=open`, not a single pending bubble — matches
    /// `engine.py:2682-2689` and `:3130-3138`.
    fn reply_pending_escalation(&self, user_id: &str, pending_text: &str) -> HandleResult {
        self.memory.append_history(user_id, Role::Bot.as_str(), pending_text, None);
        self.log_turn(user_id, "", Some(pending_text), TurnStatus::Open, json!({}));
        let name_question = self.field_prompt("name");
        self.memory.append_history(user_id, Role::Bot.as_str(), &name_question, None);
        self.log_turn(user_id, "", Some(&name_question), TurnStatus::Open, json!({}));
        HandleResult {
            bubbles: vec![pending_text.to_string(), name_question],
            next: NextAction::AwaitReply,
            status: TurnStatus::Open,
            meta: json!({}),
        }
    }

    fn reply(&self, user_id: &str, text: &str, status: TurnStatus, next: NextAction) -> HandleResult {
        self.memory.append_history(user_id, Role::Bot.as_str(), text, None);
        self.log_turn(user_id, "", Some(text), status, json!({}));
        HandleResult { bubbles: vec![text.to_string()], next, status, meta: json!({}) }
    }
}

fn chrono_now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircare_llm::StubProvider;

    fn test_engine(dir: &std::path::Path) -> Engine {
        let memory = Arc::new(MemoryStore::new(dir.join("memory.json"), 50).unwrap());
        let chatlog = Arc::new(ChatLogger::new(dir.join("logs")).unwrap());
        let sop_path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..").join("config").join("sop.json");
        let sop = Arc::new(SopCatalog::load_from_file(sop_path).unwrap());
        let llm: Arc<dyn LlmProvider> = Arc::new(StubProvider::always("{}"));
        let config = AircareConfig::default();
        let normalizer = TextNormalizer::new();
        Engine { memory, llm, chatlog, sop, config, normalizer }
    }

    #[tokio::test]
    async fn s1_mati_cover_not_closed_resolves_after_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-s1";

        let r1 = engine.handle(uid, "EAC saya mati total dari tadi malam").await;
        assert_eq!(r1.status, TurnStatus::Open);

        let r2 = engine.handle(uid, "belum kak, covernya masih longgar").await;
        assert_eq!(r2.bubbles.len(), 2, "expected instruct + next ask bubble");

        let r3 = engine.handle(uid, "sudah saya cek, lampu kuningnya menyala").await;
        assert_eq!(r3.status, TurnStatus::Resolved);
    }

    #[tokio::test]
    async fn s3_mati_escalates_to_pending_after_mcb_check_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-s3";

        engine.handle(uid, "EAC saya mati total").await;
        engine.handle(uid, "sudah saya cek, covernya rapat").await;
        let confirm = engine.handle(uid, "belum, lampunya masih mati").await;
        assert!(matches!(confirm.status, TurnStatus::Open));
        let final_turn = engine.handle(uid, "sudah dicek MCB-nya tapi masih belum nyala").await;
        assert_eq!(final_turn.status, TurnStatus::Open, "escalation to pending immediately starts data collection");
        assert_eq!(final_turn.bubbles.len(), 2, "expected pending message + name question");
    }

    #[tokio::test]
    async fn profanity_alone_never_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-profane";
        let mut last_status = TurnStatus::Open;
        for _ in 0..10 {
            last_status = engine.handle(uid, "anjing banget nih produk").await.status;
        }
        assert_eq!(last_status, TurnStatus::Open, "profanity gets a neutral apology, never blocked");
    }

    #[tokio::test]
    async fn repeated_spam_tokens_escalate_to_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-spammy";
        let mut last_status = TurnStatus::Open;
        for _ in 0..10 {
            last_status = engine.handle(uid, "a").await.status;
        }
        assert_eq!(last_status, TurnStatus::Blocked);
    }

    #[tokio::test]
    async fn additional_complaint_during_pending_uses_real_active_intent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-bunyi-pending";

        let first = engine.handle(uid, "EAC saya bunyi terus-terusan, sering banget").await;
        assert_eq!(first.bubbles.len(), 2, "bunyi fast-path should escalate straight to pending");

        let follow = engine.handle(uid, "eac saya mati total juga nih").await;
        assert_eq!(follow.status, TurnStatus::Pending);
        assert_eq!(follow.bubbles.len(), 2, "expected ack + re-ask for the still-missing field");
        assert!(follow.bubbles[0].contains("dicatat"));
    }

    #[tokio::test]
    async fn chitchat_during_pending_gets_bare_acknowledgement() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-chitchat-pending";

        engine.handle(uid, "EAC saya bunyi terus-terusan, sering banget").await;
        let r = engine.handle(uid, "halo kak, apa kabar?").await;
        assert_eq!(r.status, TurnStatus::Pending);
        assert_eq!(r.bubbles.len(), 1);
        assert!(r.bubbles[0].starts_with("Baik"));
    }

    #[tokio::test]
    async fn question_during_pending_gets_gentle_return_to_collection() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let uid = "u-question-pending";

        engine.handle(uid, "EAC saya bunyi terus-terusan, sering banget").await;
        let r = engine.handle(uid, "kenapa sih EAC bisa bunyi gini?").await;
        assert_eq!(r.status, TurnStatus::Pending);
        assert_eq!(r.bubbles.len(), 1);
        assert!(r.bubbles[0].contains("pengisian nama"));
    }
}
