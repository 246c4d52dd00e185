use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of user-visible text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ja,
}

impl Language {
    /// Pick a language from a locale tag such as `ja`, `ja-JP` or `en_US.UTF-8`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(|c| c == '-' || c == '_' || c == '.')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match primary.as_str() {
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => f.write_str("en"),
            Language::Ja => f.write_str("ja"),
        }
    }
}

/// Catalog of every user-visible sentence the session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Messages {
    language: Language,
}

impl Messages {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn pick(&self, en: impl FnOnce() -> String, ja: impl FnOnce() -> String) -> String {
        match self.language {
            Language::En => en(),
            Language::Ja => ja(),
        }
    }

    // ===== Matchmaking =====

    pub fn finding(&self) -> String {
        self.pick(
            || "Looking for someone to chat with".into(),
            || "チャット相手を探しています".into(),
        )
    }

    pub fn no_partner(&self) -> String {
        self.pick(
            || "Nobody is around right now. Try again later".into(),
            || "相手が見つかりませんでした。しばらくしてからお試しください".into(),
        )
    }

    pub fn cancelled(&self) -> String {
        self.pick(
            || "Cancelled the previous request".into(),
            || "前のリクエストを取り消しました".into(),
        )
    }

    pub fn busy(&self) -> String {
        self.pick(
            || "Already busy. Close the current session first".into(),
            || "処理中です。先に今のセッションを終了してください".into(),
        )
    }

    // ===== Rooms =====

    pub fn room_created(&self, code: &str) -> String {
        self.pick(
            || format!("Room {code} created. Share the code with your friend"),
            || format!("ルーム{code}を作成しました。コードを友達に送ってください"),
        )
    }

    pub fn joining_room(&self, code: &str) -> String {
        self.pick(
            || format!("Joining room {code}"),
            || format!("ルーム{code}に参加中です"),
        )
    }

    pub fn room_not_found(&self, code: &str) -> String {
        self.pick(
            || format!("Room {code} was not found"),
            || format!("ルーム{code}が見つかりませんでした"),
        )
    }

    pub fn room_expired(&self, code: &str) -> String {
        self.pick(
            || format!("Room {code} has expired"),
            || format!("ルーム{code}は終了しています"),
        )
    }

    pub fn room_taken(&self, code: &str) -> String {
        self.pick(
            || format!("Room {code} is already taken"),
            || format!("ルーム{code}はすでに使われています"),
        )
    }

    pub fn invalid_code(&self, raw: &str) -> String {
        self.pick(
            || format!("\"{raw}\" is not a valid room code"),
            || format!("「{raw}」はルームコードとして使えません"),
        )
    }

    pub fn invite(&self) -> String {
        self.pick(|| "Chat with me?".into(), || "わたしとチャットしませんか？".into())
    }

    pub fn no_room(&self) -> String {
        self.pick(
            || "There is no room to share".into(),
            || "共有できるルームがありません".into(),
        )
    }

    pub fn copied(&self) -> String {
        self.pick(|| "Copied to clipboard".into(), || "コピーしました！".into())
    }

    // ===== Connection =====

    pub fn connected(&self) -> String {
        self.pick(|| "Connected. Say hi!".into(), || "つながりました！".into())
    }

    pub fn peer_named(&self, name: &str) -> String {
        self.pick(
            || format!("You are chatting with {name}"),
            || format!("{name}さんとつながっています"),
        )
    }

    pub fn peer_renamed(&self, old: &str, new: &str) -> String {
        self.pick(
            || format!("{old} is now known as {new}"),
            || format!("{old}さんは{new}さんになりました"),
        )
    }

    pub fn renamed(&self, name: &str) -> String {
        self.pick(
            || format!("You are now {name}"),
            || format!("名前を{name}に変更しました"),
        )
    }

    pub fn not_connected(&self) -> String {
        self.pick(
            || "Not connected to anyone".into(),
            || "まだ誰ともつながっていません".into(),
        )
    }

    pub fn transport_failed(&self, reason: &str) -> String {
        self.pick(
            || format!("Connection problem: {reason}"),
            || format!("接続エラー: {reason}"),
        )
    }

    pub fn connection_lost(&self) -> String {
        self.pick(|| "Connection lost".into(), || "接続が切れました".into())
    }

    pub fn partner_left(&self) -> String {
        self.pick(|| "Your partner left".into(), || "相手が退出しました".into())
    }

    // ===== Lifecycle =====

    pub fn summary(&self, name: &str, minute: u64, second: u64) -> String {
        self.pick(
            || format!("Chatted with {name} for {minute} minutes and {second} seconds"),
            || format!("{name}さんと{minute}分{second}秒チャットしました"),
        )
    }

    pub fn closed(&self) -> String {
        self.pick(|| "Session closed".into(), || "セッションを終了しました".into())
    }

    pub fn already_closed(&self) -> String {
        self.pick(
            || "The session is already closed".into(),
            || "セッションはすでに終了しています".into(),
        )
    }

    pub fn ready(&self) -> String {
        self.pick(
            || "Ready for a new session".into(),
            || "新しいセッションを始められます".into(),
        )
    }
}
