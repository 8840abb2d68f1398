/// Reply formatting module
///
/// Renders tour records into the fixed multi-line template sent to users and
/// holds the static texts of the bot.

use crate::catalog::TourRecord;

/// Telegram refuses messages longer than this many UTF-16 code units
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

pub const WELCOME_TEXT: &str = "👋 سلام! خوش اومدی به ربات رسمی برترگشت ✈️\n\
    من می‌تونم کمکت کنم تا بهترین تورها رو بر اساس قیمت، مقصد یا محبوبیت پیدا کنی 🌍\n\n\
    از گزینه‌های زیر انتخاب کن 👇";

pub const HELP_TEXT: &str = "می‌تونی بنویسی مثل: «تور ارزان استانبول» یا «تور لوکس دبی»";

pub const SEARCH_PROMPT_TEXT: &str = "📍 لطفاً مقصد یا کشور مورد نظرت رو بنویس:";

pub const CHEAPEST_HEADING: &str = "💰 ارزون‌ترین تورها:";

pub const TOP_RATED_HEADING: &str = "🌟 تورهای پررضایت:";

pub const EMPTY_CATALOG_TEXT: &str = "😔 فعلاً هیچ توری در فهرست نداریم. به‌زودی برمی‌گردیم!";

pub const UNKNOWN_BUTTON_TEXT: &str = "❓ این گزینه شناخته نشد. لطفاً /start رو بزن.";

/// Reply for unmatched questions when no language model is configured
pub const AI_DISABLED_TEXT: &str =
    "🤖 فعلاً بخش هوش مصنوعی غیرفعاله. فقط می‌تونم تورها رو جستجو کنم ✈️";

/// The single user-facing mapping for a failed or empty completion
pub const AI_APOLOGY_TEXT: &str =
    "⚠️ متأسفم، الان نمی‌تونم جواب بدم. لطفاً کمی بعد دوباره امتحان کن یا اسم مقصد رو بنویس.";

pub const BUTTON_CHEAP_LABEL: &str = "💸 ارزون‌ترین تورها";
pub const BUTTON_TOP_LABEL: &str = "⭐ تورهای محبوب";
pub const BUTTON_SEARCH_LABEL: &str = "🔍 جستجوی مقصد خاص";

/// Group digits of `value` in threes with commas: 1234567 -> "1,234,567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

/// Render one tour
pub fn format_tour(tour: &TourRecord) -> String {
    let mut lines = vec![format!("🏖 مقصد: {}", tour.destination)];

    if let Some(category) = tour.category.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("🏷 دسته: {}", category));
    }

    lines.push(format!("💰 قیمت: {} تومان", group_thousands(tour.price)));
    lines.push(format!("🕓 مدت: {}", tour.duration));
    lines.push(format!("⭐ رضایت: {}/5", tour.satisfaction));
    lines.push(format!("📋 جزئیات: {}", tour.details));

    lines.join("\n")
}

/// Render several tours under a heading, separated by blank lines
pub fn format_tours(heading: &str, tours: &[&TourRecord]) -> String {
    let body = tours
        .iter()
        .map(|tour| format_tour(tour))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n{}", heading, body)
}

pub fn search_heading(query: &str) -> String {
    format!("🧭 نتایج برای '{}':", query)
}

/// Length as Telegram counts it: in UTF-16 code units, so most emoji count twice
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split `text` into chunks Telegram will accept, cutting at blank lines
/// (record boundaries) where possible and at character boundaries otherwise.
/// `limit` is in UTF-16 code units.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if telegram_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in text.split("\n\n") {
        let block_len = telegram_len(block);
        let separator = if current.is_empty() { 0 } else { 2 };

        if current_len + separator + block_len <= limit {
            if separator > 0 {
                current.push_str("\n\n");
            }
            current.push_str(block);
            current_len += separator + block_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if block_len <= limit {
            current.push_str(block);
            current_len = block_len;
            continue;
        }

        // A single oversized record: hard-cut it without splitting a character
        let mut piece = String::new();
        let mut piece_len = 0;
        for ch in block.chars() {
            if !piece.is_empty() && piece_len + ch.len_utf16() > limit {
                chunks.push(std::mem::take(&mut piece));
                piece_len = 0;
            }
            piece.push(ch);
            piece_len += ch.len_utf16();
        }
        if !piece.is_empty() {
            chunks.push(piece);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
