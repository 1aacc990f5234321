//! Diagnostic step engine — the fixed 3-question housing-subsidy
//! questionnaire with a terminal result card.
//!
//! Pure over its inputs: no storage or network calls, no failure paths.
//! Unrecognized answer payloads degrade to a recorded default and the step
//! still advances.

use crate::line::ReplyMessage;
use crate::state::{COMPLETED_STEP, ConversationState, DiagnosticAnswers, Mode};

/// Postback payload that restarts the flow from any state.
pub const RESTART_PAYLOAD: &str = "restart_diagnostic";

/// Free-text commands that restart the flow, checked before any mode
/// handling.
pub const RESTART_COMMANDS: [&str; 3] = ["診断", "診断開始", "/diagnostic"];

const SUBSIDY_YES: &str = "subsidy_yes";
const SUBSIDY_NO: &str = "subsidy_no";

const AMOUNT_HIGH: &str = "amount_high";
const AMOUNT_MEDIUM: &str = "amount_medium";
const AMOUNT_LOW: &str = "amount_low";

const RENT_LOW: &str = "rent_low";
const RENT_MEDIUM: &str = "rent_medium";
const RENT_HIGH: &str = "rent_high";

/// Advance the diagnostic flow by one step.
///
/// Records the answer payload against the current step (if any), increments
/// the step, and returns either the next question prompt or, past the last
/// question, the result card — flipping the state into chat mode with the
/// step at its completed sentinel.
///
/// The restart payload short-circuits everything: the flow resets to step 0
/// with cleared answers and the first question is returned.
pub fn advance(state: &mut ConversationState, payload: Option<&str>) -> ReplyMessage {
    if payload == Some(RESTART_PAYLOAD) {
        state.reset_diagnostic();
        return prompt_for_step(0);
    }

    let step = state.diagnostic_step;

    if let Some(data) = payload {
        match step {
            0 => state.diagnostic_answers.subsidy = Some(data == SUBSIDY_YES),
            1 => state.diagnostic_answers.subsidy_amount = Some(amount_for_tag(data)),
            2 => state.diagnostic_answers.rent = Some(data.to_string()),
            _ => {}
        }
    }

    let next = step.saturating_add(1);
    if next <= 2 {
        state.diagnostic_step = next;
        return prompt_for_step(next);
    }

    state.diagnostic_step = COMPLETED_STEP;
    state.mode = Mode::Chat;

    let subsidy = subsidy_total(&state.diagnostic_answers);
    let rent = rent_band_label(state.diagnostic_answers.rent.as_deref().unwrap_or(""));
    result_card(subsidy, rent)
}

/// Quick-reply prompt for an active question step. Any step outside 0..=2
/// yields the plain completion text.
pub fn prompt_for_step(step: u8) -> ReplyMessage {
    match step {
        0 => ReplyMessage::quick_reply(
            "🏠 PairSpace診断にようこそ！\n\nまず、現在の会社で家賃補助制度はありますか？",
            &[("はい", SUBSIDY_YES), ("いいえ", SUBSIDY_NO)],
        ),
        1 => ReplyMessage::quick_reply(
            "💰 家賃補助の金額はどのくらいですか？",
            &[
                ("5万円以上", AMOUNT_HIGH),
                ("3万円程度", AMOUNT_MEDIUM),
                ("1万円以下", AMOUNT_LOW),
            ],
        ),
        2 => ReplyMessage::quick_reply(
            "🏘️ 希望する家賃帯を教えてください",
            &[
                ("10-13万円", RENT_LOW),
                ("13-16万円", RENT_MEDIUM),
                ("16万円以上", RENT_HIGH),
            ],
        ),
        _ => ReplyMessage::text("診断が完了しました！🎉"),
    }
}

/// Effective subsidy amount: the recorded amount when a subsidy exists,
/// otherwise 0.
pub fn subsidy_total(answers: &DiagnosticAnswers) -> u32 {
    if answers.subsidy != Some(true) {
        return 0;
    }
    answers.subsidy_amount.unwrap_or(0)
}

/// Display string for a rent-band tag. Unrecognized tags show as unset.
pub fn rent_band_label(tag: &str) -> &'static str {
    match tag {
        RENT_LOW => "10-13万円",
        RENT_MEDIUM => "13-16万円",
        RENT_HIGH => "16万円以上",
        _ => "未設定",
    }
}

fn amount_for_tag(tag: &str) -> u32 {
    match tag {
        AMOUNT_HIGH => 50000,
        AMOUNT_MEDIUM => 30000,
        AMOUNT_LOW => 10000,
        _ => 0,
    }
}

/// Result flex bubble: subsidy summary, chosen rent band, consult CTA, and
/// a restart button carrying [`RESTART_PAYLOAD`].
fn result_card(subsidy: u32, rent: &str) -> ReplyMessage {
    let contents = serde_json::json!({
        "type": "bubble",
        "header": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {
                    "type": "text",
                    "text": "🏠 PairSpace 診断結果",
                    "weight": "bold",
                    "size": "lg",
                    "color": "#1DB446"
                }
            ]
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "spacing": "md",
            "contents": [
                {
                    "type": "text",
                    "text": format!("💰 家賃補助：最大 ¥{}", format_thousands(subsidy)),
                    "size": "lg",
                    "weight": "bold"
                },
                {
                    "type": "text",
                    "text": format!("🏘️ 希望家賃帯：{rent}"),
                    "size": "md"
                },
                {
                    "type": "text",
                    "text": "✨ 実質負担を大幅カットできます！",
                    "size": "md",
                    "color": "#1DB446"
                },
                {
                    "type": "separator",
                    "margin": "md"
                },
                {
                    "type": "text",
                    "text": "🤖 この後はAIチャットで何でもご質問いただけます！",
                    "size": "sm",
                    "color": "#666666",
                    "wrap": true
                }
            ]
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": [
                {
                    "type": "button",
                    "style": "primary",
                    "height": "sm",
                    "action": {
                        "type": "uri",
                        "label": "📞 Zoom無料相談を予約",
                        "uri": "https://liff.line.me/XXXXXXXX"
                    }
                },
                {
                    "type": "button",
                    "style": "secondary",
                    "height": "sm",
                    "action": {
                        "type": "postback",
                        "label": "🔄 診断をやり直す",
                        "data": RESTART_PAYLOAD
                    }
                }
            ]
        }
    });

    ReplyMessage::flex("診断結果", contents)
}

/// Group digits in threes, e.g. 50000 → "50,000".
fn format_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
