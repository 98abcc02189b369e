//! Message texts and inline keyboards for the search flow.
//!
//! All user-facing HTML is assembled here so handlers stay about control
//! flow. User-controlled strings (queries, titles, names) are escaped
//! before they reach HTML parse mode.

use crate::bot::callbacks::CallbackAction;
use crate::bot::pagination::{has_next, has_previous, page_window};
use crate::bot::session::SearchSession;
use crate::provider::{MediaKind, SearchResult};
use crate::utils::{format_duration, truncate_str};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Longest title shown on a result button
const BUTTON_TITLE_CHARS: usize = 50;

/// Singular noun for a media kind, for message wording.
const fn kind_word(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "song",
        MediaKind::Video => "video",
    }
}

/// `/start` welcome and usage text.
#[must_use]
pub fn welcome_text() -> String {
    "🎵 <b>YouTube Downloader Bot</b> 🎬\n\n\
     I can search YouTube and send you songs and videos.\n\n\
     <b>Commands:</b>\n\
     • <code>/song &lt;song name&gt;</code> — search and download audio (MP3)\n\
     • <code>/vid &lt;video name&gt;</code> — search and download video (MP4)\n\n\
     <b>Example:</b>\n\
     • <code>/song Imagine Dragons Believer</code>\n\
     • <code>/vid Funny cat videos</code>\n\n\
     Send a command and I'll show search results with navigation buttons."
        .to_string()
}

/// Reply for a command issued without a query.
#[must_use]
pub fn missing_query_text(kind: MediaKind) -> String {
    let example = match kind {
        MediaKind::Audio => "/song Imagine Dragons Believer",
        MediaKind::Video => "/vid Funny cat videos",
    };
    format!(
        "❌ Please provide a {} name!\n\nExample: <code>{example}</code>",
        kind_word(kind)
    )
}

/// Placeholder shown while the provider search runs.
#[must_use]
pub fn searching_text(kind: MediaKind) -> String {
    format!("🔍 Searching for {}...", kind.noun())
}

/// Search failure wording, timeout distinguished from generic failure.
#[must_use]
pub fn search_timeout_text() -> String {
    "⌛ The search timed out. Please try again in a moment.".to_string()
}

#[must_use]
pub fn search_failed_text() -> String {
    "❌ An error occurred while searching. Please try again.".to_string()
}

#[must_use]
pub fn no_results_text() -> String {
    "❌ No results found. Please try a different search term.".to_string()
}

/// Header above the result keyboard.
#[must_use]
pub fn results_text(session: &SearchSession) -> String {
    let kind = session.kind;
    format!(
        "{} <b>Search results for:</b> <code>{}</code>\n\n\
         📊 Found {} {}\n\n\
         Select a {} to download:",
        kind.emoji(),
        html_escape::encode_text(&session.query),
        session.results.len(),
        kind.noun(),
        kind_word(kind),
    )
}

/// Expiry wording for any event that finds no session.
#[must_use]
pub fn session_expired_text() -> String {
    "❌ Search session expired. Please start a new search.".to_string()
}

/// Transient alert for a foreign user pressing someone else's button.
#[must_use]
pub fn not_your_search_text() -> String {
    "❌ This is not your search!".to_string()
}

/// Transient alert for a selection index that no longer exists.
#[must_use]
pub fn invalid_selection_text() -> String {
    "❌ Invalid selection!".to_string()
}

/// Cancellation notice with a clickable mention of whoever cancelled.
#[must_use]
pub fn cancelled_text(user_id: i64, first_name: &str) -> String {
    format!(
        "❌ Search cancelled by <a href=\"tg://user?id={user_id}\">{}</a>",
        html_escape::encode_text(first_name)
    )
}

#[must_use]
pub fn downloading_text(item: &SearchResult, kind: MediaKind) -> String {
    format!(
        "{} <b>Downloading:</b> <code>{}</code>\n\n⏳ Please wait, this may take a few minutes...",
        kind.emoji(),
        html_escape::encode_text(&item.title)
    )
}

#[must_use]
pub fn uploading_text(kind: MediaKind) -> String {
    format!("📤 Uploading {}...", kind_word(kind))
}

#[must_use]
pub fn delivered_text(item: &SearchResult) -> String {
    format!(
        "✅ Successfully downloaded and sent: <code>{}</code>",
        html_escape::encode_text(&item.title)
    )
}

#[must_use]
pub fn download_failed_text() -> String {
    "❌ Download failed. The video might be unavailable or restricted.".to_string()
}

#[must_use]
pub fn oversized_text() -> String {
    "❌ File is too large to send via Telegram (>50MB). \
     Please try a shorter video or song."
        .to_string()
}

#[must_use]
pub fn delivery_failed_text() -> String {
    "❌ An error occurred during download or upload. Please try again.".to_string()
}

/// Caption attached to the delivered file.
#[must_use]
pub fn caption_text(item: &SearchResult, kind: MediaKind) -> String {
    format!(
        "{} <b>{}</b>\n👤 <b>By:</b> {}",
        kind.emoji(),
        html_escape::encode_text(&item.title),
        html_escape::encode_text(&item.uploader)
    )
}

/// Inline keyboard for the session's current page: one row per visible
/// result, a navigation row, and a cancel row.
#[must_use]
pub fn results_keyboard(session: &SearchSession) -> InlineKeyboardMarkup {
    let owner = session.owner;
    let page = session.page;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for (index, item) in page_window(&session.results, page) {
        let label = format!(
            "{} {} [{}]",
            session.kind.emoji(),
            truncate_str(&item.title, BUTTON_TITLE_CHARS),
            format_duration(item.duration_secs)
        );
        let action = CallbackAction::Download {
            kind: session.kind,
            index,
            owner,
        };
        rows.push(vec![InlineKeyboardButton::callback(label, action.encode())]);
    }

    let mut nav = Vec::new();
    if has_previous(page) {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Previous",
            CallbackAction::Page { page: page - 1, owner }.encode(),
        ));
    }
    nav.push(InlineKeyboardButton::callback(
        format!("📄 {}/{}", page + 1, session.total_pages()),
        CallbackAction::Noop.encode(),
    ));
    if has_next(page, session.results.len()) {
        nav.push(InlineKeyboardButton::callback(
            "Next ➡️",
            CallbackAction::Page { page: page + 1, owner }.encode(),
        ));
    }
    rows.push(nav);

    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Cancel",
        CallbackAction::Cancel { owner }.encode(),
    )]);

    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::pagination::PAGE_SIZE;

    fn session(n: usize, page: usize) -> SearchSession {
        let results: Vec<SearchResult> = (0..n)
            .map(|i| SearchResult {
                id: format!("id{i}"),
                title: format!("title {i}"),
                duration_secs: 125,
                uploader: "up".to_string(),
                url: format!("https://example.com/{i}"),
            })
            .collect();
        let mut s = SearchSession::from_results(77, "test song", MediaKind::Audio, results)
            .expect("non-empty");
        s.page = page;
        s
    }

    #[test]
    fn first_page_of_twelve_has_only_next_nav() {
        let markup = results_keyboard(&session(12, 0));
        // 5 result rows + nav row + cancel row
        assert_eq!(markup.inline_keyboard.len(), PAGE_SIZE + 2);

        let nav = &markup.inline_keyboard[PAGE_SIZE];
        assert_eq!(nav.len(), 2); // indicator + next, no previous
        assert_eq!(nav[0].text, "📄 1/3");
        assert_eq!(nav[1].text, "Next ➡️");
    }

    #[test]
    fn last_page_of_twelve_has_only_previous_nav() {
        let markup = results_keyboard(&session(12, 2));
        // 2 result rows + nav row + cancel row
        assert_eq!(markup.inline_keyboard.len(), 4);

        let nav = &markup.inline_keyboard[2];
        assert_eq!(nav.len(), 2); // previous + indicator, no next
        assert_eq!(nav[0].text, "⬅️ Previous");
        assert_eq!(nav[1].text, "📄 3/3");

        let cancel = &markup.inline_keyboard[3];
        assert_eq!(cancel[0].text, "❌ Cancel");
    }

    #[test]
    fn result_buttons_carry_global_indices() {
        let markup = results_keyboard(&session(12, 2));
        let first = &markup.inline_keyboard[0][0];
        let teloxide::types::InlineKeyboardButtonKind::CallbackData(data) = &first.kind else {
            panic!("result button must be a callback button");
        };
        assert_eq!(
            CallbackAction::parse(data),
            Some(CallbackAction::Download {
                kind: MediaKind::Audio,
                index: 10,
                owner: 77
            })
        );
    }

    #[test]
    fn cancelled_text_mentions_the_user() {
        let text = cancelled_text(42, "A <b> user");
        assert!(text.contains("<a href=\"tg://user?id=42\">A &lt;b&gt; user</a>"));
    }

    #[test]
    fn results_text_escapes_query() {
        let mut s = session(1, 0);
        s.query = "a <b> & c".to_string();
        let text = results_text(&s);
        assert!(text.contains("a &lt;b&gt; &amp; c"));
    }
}
