use std::sync::OnceLock;

use aircare_core::{Answer, Intent, TurnStatus};
use serde::{Deserialize, Serialize};

use crate::answer::parse_answer;
use crate::sop::{SopCatalog, Step};

fn explicit_resolution_phrases() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "sudah bisa", "sudah normal", "sudah nyala", "sudah oke", "sudah membaik",
            "alhamdulillah sudah", "makasih sudah beres", "udah bener", "sudah berfungsi",
            "sudah tidak", "beres kak", "sudah selesai",
        ]
    })
    .as_slice()
}

fn self_correction_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["eh", "tunggu", "wait", "eits", "bentar"]).as_slice()
}

fn negative_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["belum", "tidak", "gak", "ga", "nggak", "salah", "bukan"]).as_slice()
}

fn ambiguous_positive_hedges() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["kayaknya udah", "kayaknya sudah", "mungkin udah", "mungkin sudah", "sepertinya sudah"]).as_slice()
}

/// A complaint a user raised while another intent was already active;
/// held until the active SOP walk finishes, per the lock-intent rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedComplaint {
    pub intent: Intent,
    pub raw_text: String,
}

/// What stage of a step we're waiting on a reply for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwaitKind {
    /// Waiting on the initial ask/expected_result answer.
    Answer,
    /// Waiting on the confirm_templates verification question inserted
    /// by the resolution guard.
    Confirm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveWalk {
    pub intent: Intent,
    pub step_id: String,
    pub awaiting: AwaitKind,
}

/// True when `text` reads as the user declaring the problem already
/// resolved, independent of whatever step is active — this bypasses all
/// step logic and jumps straight to a resolved closing.
pub fn is_explicit_resolution(text: &str) -> bool {
    let lower = text.to_lowercase();
    explicit_resolution_phrases().iter().any(|p| lower.contains(p))
}

/// True when the user appears to be retracting the answer they just
/// gave ("eh tunggu, belum deh") — a correction marker followed
/// anywhere by a negative word in the same message.
pub fn is_self_correction(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_marker = self_correction_markers().iter().any(|m| lower.contains(m));
    has_marker && negative_markers().iter().any(|n| lower.contains(n))
}

/// True when a "yes" reads as hedged rather than confident ("kayaknya
/// udah sih") — these trigger the resolution guard's verification
/// question instead of resolving immediately.
pub fn is_ambiguous_positive(text: &str) -> bool {
    let lower = text.to_lowercase();
    ambiguous_positive_hedges().iter().any(|h| lower.contains(h))
}

pub enum StepOutcome<'a> {
    /// Ask the next step's question.
    Ask(&'a Step),
    /// Emit an instruct bubble, then continue automatically to the next
    /// step's ask (or confirm, if the branch targets the same step).
    InstructThenAsk(&'a Step, &'a Step),
    /// A resolution guard verification question for the current step.
    AskConfirm(&'a Step),
    /// Terminal resolved state.
    Resolved(&'a Step),
    /// Terminal pending (escalated to technician) state.
    Pending(&'a Step),
    /// The answer didn't parse; ask again with a clarification template.
    Clarify,
}

/// Advances one step of the walk given the parsed answer at `step`,
/// applying the branch named `on_answer_<answer>` in the step's logic.
/// `awaiting` distinguishes "this is the first ask" from "this is the
/// resolution-guard confirm question" — a `yes` to a confirm question
/// always resolves or falls through to `next_if_no`'s target on `no`.
pub fn step_outcome<'a>(
    catalog: &'a SopCatalog,
    intent: Intent,
    step: &'a Step,
    awaiting: AwaitKind,
    answer: Answer,
) -> StepOutcome<'a> {
    if answer == Answer::Unclear {
        return StepOutcome::Clarify;
    }

    if awaiting == AwaitKind::Confirm {
        return match answer {
            Answer::Yes => StepOutcome::Resolved(step),
            Answer::No => {
                let sop = catalog.intent_sop(intent);
                if let Some(branch) = step.logic.branch_for("no") {
                    if let Some(next_id) = &branch.next_if_no {
                        if let Some(next) = sop.step(next_id) {
                            return StepOutcome::Ask(next);
                        }
                    }
                    if branch.pending_if_no {
                        return StepOutcome::Pending(step);
                    }
                }
                StepOutcome::Pending(step)
            }
            _ => StepOutcome::Clarify,
        };
    }

    let key = match answer {
        Answer::Yes => "yes",
        Answer::No => "no",
        Answer::Sering => "sering",
        Answer::Jarang => "jarang",
        Answer::Unclear => unreachable!(),
    };
    let Some(branch) = step.logic.branch_for(key) else {
        return StepOutcome::Clarify;
    };
    let sop = catalog.intent_sop(intent);

    if branch.resolve {
        return StepOutcome::Resolved(step);
    }
    if branch.pending {
        return StepOutcome::Pending(step);
    }
    if branch.resolve_if_yes {
        if !step.confirm_templates.is_empty() {
            return StepOutcome::AskConfirm(step);
        }
        return StepOutcome::Resolved(step);
    }
    if branch.instruct {
        if let Some(next_id) = &branch.next {
            if let Some(next) = sop.step(next_id) {
                return StepOutcome::InstructThenAsk(step, next);
            }
        }
        // instruct with no next step: re-ask the same step (used for the
        // first branch of a two-sided instruct, e.g. bau's cek_filter).
        return StepOutcome::InstructThenAsk(step, step);
    }
    StepOutcome::Clarify
}

/// Maps a terminal [`StepOutcome`] to the [`TurnStatus`] surfaced to the
/// transport layer; non-terminal outcomes stay `Open`.
pub fn outcome_status(outcome: &StepOutcome) -> TurnStatus {
    match outcome {
        StepOutcome::Resolved(_) => TurnStatus::Resolved,
        StepOutcome::Pending(_) => TurnStatus::Pending,
        _ => TurnStatus::Open,
    }
}

/// Bunyi's intensity question can be skipped when the very first
/// complaint already states frequency unprompted ("bunyinya sering
/// banget kak") — parses the opening utterance against the frequency
/// vocabulary and returns the answer if unambiguous.
pub fn bunyi_intensity_fast_path(first_utterance: &str) -> Option<Answer> {
    match parse_answer(first_utterance, true) {
        Answer::Unclear => None,
        a => Some(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sop::SopCatalog;

    fn catalog() -> SopCatalog {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("sop.json");
        SopCatalog::load_from_file(path).unwrap()
    }

    #[test]
    fn explicit_resolution_phrase_detected() {
        assert!(is_explicit_resolution("alhamdulillah sudah nyala normal"));
        assert!(!is_explicit_resolution("masih mati nih"));
    }

    #[test]
    fn self_correction_requires_marker_and_negative() {
        assert!(is_self_correction("eh tunggu, belum saya coba"));
        assert!(!is_self_correction("eh iya sudah bener kok"));
    }

    #[test]
    fn mati_yes_on_cek_tutup_instructs_then_asks_remote_low() {
        let cat = catalog();
        let sop = cat.intent_sop(Intent::Mati);
        let step = sop.step("cek_tutup").unwrap();
        let outcome = step_outcome(&cat, Intent::Mati, step, AwaitKind::Answer, Answer::Yes);
        match outcome {
            StepOutcome::InstructThenAsk(_, next) => assert_eq!(next.id, "cek_remote_low"),
            _ => panic!("expected instruct-then-ask"),
        }
    }

    #[test]
    fn mati_resolve_if_yes_inserts_confirm_question() {
        let cat = catalog();
        let sop = cat.intent_sop(Intent::Mati);
        let step = sop.step("cek_remote_low").unwrap();
        let outcome = step_outcome(&cat, Intent::Mati, step, AwaitKind::Answer, Answer::Yes);
        assert!(matches!(outcome, StepOutcome::AskConfirm(_)));
    }

    #[test]
    fn confirm_no_falls_through_to_mcb() {
        let cat = catalog();
        let sop = cat.intent_sop(Intent::Mati);
        let step = sop.step("cek_remote_low").unwrap();
        let outcome = step_outcome(&cat, Intent::Mati, step, AwaitKind::Confirm, Answer::No);
        match outcome {
            StepOutcome::Ask(next) => assert_eq!(next.id, "cek_mcb"),
            _ => panic!("expected fall-through ask"),
        }
    }

    #[test]
    fn mcb_no_is_pending() {
        let cat = catalog();
        let sop = cat.intent_sop(Intent::Mati);
        let step = sop.step("cek_mcb").unwrap();
        let outcome = step_outcome(&cat, Intent::Mati, step, AwaitKind::Answer, Answer::No);
        assert!(matches!(outcome, StepOutcome::Pending(_)));
    }
}
