// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keyword-based AI involvement hints.
//!
//! Hints are advisory: they pre-fill the `ai_status` suggestion on a
//! candidate and nothing more. The human review step decides the final
//! classification.

/// Applications that are themselves AI products or carry prominent AI
/// features.
pub const AI_APP_KEYWORDS: &[&str] = &[
    "cursor",
    "copilot",
    "cody",
    "claude",
    "chatgpt",
    "openai",
    "anthropic",
    "gpt",
    "gemini",
    "bard",
    "perplexity",
    "phind",
    "tabnine",
    "kite",
    "windsurf",
    "continue",
    "aider",
    "codeium",
    "sourcegraph",
    "pieces",
    "notion",
    "obsidian",
    "grammarly",
    "jasper",
    "copy.ai",
    "writesonic",
    "midjourney",
    "dall-e",
    "stable-diffusion",
    "runway",
    "luma",
    "whisper",
    "otter",
    "descript",
    "krisp",
    "raycast",
    "alfred",
    "warp",
    "fig",
    "zed",
];

/// Applications that host third-party AI extensions (editors and IDEs,
/// mostly) without being AI products themselves.
pub const AI_HOST_KEYWORDS: &[&str] = &[
    "visual studio code",
    "vscode",
    "intellij",
    "pycharm",
    "webstorm",
    "goland",
    "rider",
    "clion",
    "datagrip",
    "rubymine",
    "phpstorm",
    "android studio",
    "xcode",
    "sublime text",
    "atom",
    "vim",
    "neovim",
    "emacs",
    "nova",
    "bbedit",
    "textmate",
];

/// Suggested AI involvement for a discovered application.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AiHint {
    pub is_ai_app: bool,
    pub is_ai_host: bool,
}

/// Match `name` (and optionally a bundle identifier) against the keyword
/// lists. AI-app keywords win over host keywords.
pub fn classify(name: &str, bundle_id: &str) -> AiHint {
    let name = name.to_lowercase();
    let bundle_id = bundle_id.to_lowercase();

    for keyword in AI_APP_KEYWORDS {
        if name.contains(keyword) || (!bundle_id.is_empty() && bundle_id.contains(keyword)) {
            return AiHint {
                is_ai_app: true,
                is_ai_host: false,
            };
        }
    }

    for keyword in AI_HOST_KEYWORDS {
        if name.contains(keyword) {
            return AiHint {
                is_ai_app: false,
                is_ai_host: true,
            };
        }
    }

    AiHint::default()
}

/// Coarse category for a discovered application.
pub fn category(name: &str, hint: AiHint) -> &'static str {
    let name = name.to_lowercase();

    if hint.is_ai_app {
        if ["code", "ide", "cursor", "copilot", "cody", "studio", "zed"]
            .iter()
            .any(|kw| name.contains(kw))
        {
            "dev_tools"
        } else if ["chat", "claude", "gpt", "gemini", "perplexity"]
            .iter()
            .any(|kw| name.contains(kw))
        {
            "chat"
        } else if ["notion", "obsidian", "grammarly"]
            .iter()
            .any(|kw| name.contains(kw))
        {
            "productivity"
        } else if ["midjourney", "dall", "stable", "runway"]
            .iter()
            .any(|kw| name.contains(kw))
        {
            "creative"
        } else {
            "other"
        }
    } else if hint.is_ai_host {
        "dev_tools"
    } else {
        "other"
    }
}
