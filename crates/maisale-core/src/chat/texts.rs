//! Fixed user-facing texts, one per language
//!
//! The clarify question doubles as a counter key: prior assistant messages
//! equal to it count as clarify attempts, so edits here reset those counts
//! for messages stored without the clarify marker.

use super::Language;

pub const CLARIFY_VI: &str = "Để em hỗ trợ chính xác, quý khách đang cần tư vấn lắp ráp máy, hỏi thông tin mua hàng hay bảo hành ạ?";
pub const CLARIFY_EN: &str = "To help you accurately, are you looking for PC build advice, purchase information, or warranty support?";

pub const FAREWELL_VI: &str = "Hiện mình chưa đủ thông tin để hỗ trợ chính xác. Bạn có thể quay lại khi sẵn sàng chia sẻ thêm nhé. Cảm ơn bạn!";
pub const FAREWELL_EN: &str = "I don't have enough information to help accurately yet. Feel free to come back when you're ready to share more. Thank you!";

pub const APOLOGY_VI: &str = "Xin lỗi, em gặp lỗi khi tạo câu trả lời.";
pub const APOLOGY_EN: &str = "Sorry, I encountered an error while generating a response.";

pub const TIMEOUT_VI: &str = "Xin lỗi, hệ thống phản hồi quá lâu. Quý khách vui lòng thử lại sau ạ.";
pub const TIMEOUT_EN: &str = "Sorry, the response is taking too long. Please try again later.";

/// Metadata key/value attached to persisted clarify messages
pub const CLARIFY_MARKER_KEY: &str = "kind";
pub const CLARIFY_MARKER_VALUE: &str = "clarify";

pub fn clarify_question(language: Language) -> &'static str {
    match language {
        Language::Vi => CLARIFY_VI,
        Language::En => CLARIFY_EN,
    }
}

pub fn farewell(language: Language) -> &'static str {
    match language {
        Language::Vi => FAREWELL_VI,
        Language::En => FAREWELL_EN,
    }
}

pub fn apology(language: Language) -> &'static str {
    match language {
        Language::Vi => APOLOGY_VI,
        Language::En => APOLOGY_EN,
    }
}

pub fn timeout_notice(language: Language) -> &'static str {
    match language {
        Language::Vi => TIMEOUT_VI,
        Language::En => TIMEOUT_EN,
    }
}

/// Reply language and length directive for the generation prompt
pub fn response_instruction(language: Language) -> &'static str {
    match language {
        Language::Vi => "Trả lời bằng tiếng Việt, ngắn gọn trong khoảng 5 câu.",
        Language::En => "Answer in English, in about 5 sentences.",
    }
}
