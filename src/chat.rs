use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::chat_context::guess_files_in_message;
use crate::config::Config;
use crate::conversation::{Conversation, Role};
use crate::file_ops::{EditOutcome, apply_diff_edit, create_file};
use crate::llm::{ChatBackend, HttpBackend};
use crate::paths::normalize_path;
use crate::render;
use crate::reply::{AssistantResponse, FileCreateRequest, FileEditRequest, parse_response};
use crate::util::{Prompter, StdinPrompter, confirm_label, truncate_with_suffix, user_label};

const PARSE_FAILURE: &str = "Failed to parse JSON response from assistant";

pub async fn run_chat(cfg: &Config) -> Result<()> {
    let backend = HttpBackend::from_config(cfg)?;
    if !backend.has_api_key() {
        warn!(env = %cfg.api_key_env, "no API key configured, requests will be unauthenticated");
    }
    info!(model = %cfg.model, base_url = %cfg.base_url, "starting chat session");
    ChatSession::new(cfg.system_prompt(), backend, StdinPrompter)
        .run()
        .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand<'a> {
    Add(&'a str),
    Files,
    Help,
}

/// Recognize a locally handled command. Matching is case-insensitive on the
/// trimmed input; the `/add` argument keeps its original case.
pub fn parse_local_command(input: &str) -> Option<LocalCommand<'_>> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("/add") {
        return Some(LocalCommand::Add(""));
    }
    if trimmed
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("/add "))
    {
        return Some(LocalCommand::Add(trimmed[5..].trim()));
    }
    if trimmed.eq_ignore_ascii_case("/files") {
        return Some(LocalCommand::Files);
    }
    if trimmed.eq_ignore_ascii_case("/help") {
        return Some(LocalCommand::Help);
    }
    None
}

pub fn is_exit(input: &str) -> bool {
    let t = input.trim();
    t.eq_ignore_ascii_case("exit") || t.eq_ignore_ascii_case("quit")
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub reply: String,
    pub created: Vec<PathBuf>,
    pub applied: Vec<PathBuf>,
    /// Edits whose original snippet was not in the file.
    pub unmatched: Vec<PathBuf>,
    /// Edits removed before confirmation because their file could not be loaded.
    pub dropped: Vec<String>,
    pub failed: Vec<PathBuf>,
    pub edits_declined: bool,
}

pub struct ChatSession<B, P> {
    conversation: Conversation,
    backend: B,
    prompter: P,
}

impl<B: ChatBackend, P: Prompter> ChatSession<B, P> {
    pub fn new(system_prompt: &str, backend: B, prompter: P) -> Self {
        Self {
            conversation: Conversation::new(system_prompt),
            backend,
            prompter,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn run(&mut self) -> Result<()> {
        render::banner();
        loop {
            let input = match self.prompter.ask(&user_label()) {
                Ok(Some(input)) => input,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %format!("{e:#}"), "cannot read input, ending session");
                    render::failure(&format!("{e:#}"));
                    break;
                }
            };
            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            if is_exit(input) {
                println!("Goodbye!");
                break;
            }
            if self.handle_local_command(input) {
                continue;
            }

            match self.run_turn(input).await {
                Ok(report) => info!(
                    reply = %truncate_with_suffix(&report.reply, 80, "..."),
                    created = report.created.len(),
                    applied = report.applied.len(),
                    unmatched = report.unmatched.len(),
                    dropped = report.dropped.len(),
                    "turn finished"
                ),
                Err(e) => {
                    error!(error = %format!("{e:#}"), "turn failed");
                    render::failure(&format!("{e:#}"));
                }
            }
        }
        println!("Session finished.");
        Ok(())
    }

    /// Handle `/add`, `/files` and `/help`. Returns `false` for anything that
    /// should go to the model.
    pub fn handle_local_command(&mut self, input: &str) -> bool {
        let Some(cmd) = parse_local_command(input) else {
            return false;
        };
        match cmd {
            LocalCommand::Add(raw) => self.add_command(raw),
            LocalCommand::Files => {
                let files = self.conversation.files_in_context();
                if files.is_empty() {
                    render::info("No files in the conversation yet.");
                }
                for f in files {
                    println!("  {}", f.display());
                }
            }
            LocalCommand::Help => render::help(),
        }
        true
    }

    fn add_command(&mut self, raw: &str) {
        let added = normalize_path(raw).and_then(|path| {
            let added = self.conversation.add_file_context(&path)?;
            Ok((path, added))
        });
        match added {
            Ok((path, true)) => {
                render::success(&format!("Added file '{}' to conversation.", path.display()))
            }
            Ok((path, false)) => {
                render::info(&format!("File '{}' is already in the conversation.", path.display()))
            }
            Err(e) => render::failure(&format!("Could not add file '{raw}': {e}")),
        }
    }

    pub async fn run_turn(&mut self, input: &str) -> Result<TurnReport> {
        self.preload_mentioned_files(input);
        self.conversation.append_turn(Role::User, input);

        let response = match self.fetch_reply().await {
            Ok(response) => response,
            Err(synthetic) => {
                return Ok(TurnReport {
                    reply: synthetic.assistant_reply,
                    ..TurnReport::default()
                });
            }
        };

        let mut report = TurnReport::default();
        let edits = self.validate_edits(response.files_to_edit, &mut report);
        self.conversation
            .append_turn(Role::Assistant, response.assistant_reply.clone());
        report.reply = response.assistant_reply;

        for request in &response.files_to_create {
            self.apply_creation(request, &mut report);
        }

        if !edits.is_empty() {
            render::proposed_edits(&edits);
            let answer = self.prompter.ask(&confirm_label())?;
            if answer.as_deref().map(str::trim) == Some("y") {
                for edit in &edits {
                    self.apply_edit(edit, &mut report);
                }
            } else {
                render::info("Skipped applying diff edits.");
                report.edits_declined = true;
            }
        }
        Ok(report)
    }

    fn preload_mentioned_files(&mut self, input: &str) {
        for path in guess_files_in_message(input) {
            if let Err(e) = self.conversation.add_file_context(&path) {
                debug!(path = %path.display(), error = %e, "mentioned path not loaded");
                render::failure(&format!(
                    "Skipping '{}': it does not exist or is not accessible",
                    path.display()
                ));
            }
        }
    }

    /// Stream the model's answer and decode it. On failure the error is
    /// returned as a synthetic reply, which is shown but not recorded.
    async fn fetch_reply(&mut self) -> std::result::Result<AssistantResponse, AssistantResponse> {
        debug!(messages = self.conversation.len(), "requesting reply");
        render::assistant_prefix();
        let mut show = |fragment: &str| render::fragment(fragment);
        let text = match self
            .backend
            .complete(self.conversation.messages(), &mut show)
            .await
        {
            Ok(text) => {
                println!();
                text
            }
            Err(e) => {
                let msg = format!("Remote API error: {e:#}");
                warn!(error = %format!("{e:#}"), "chat completion failed");
                render::failure(&msg);
                return Err(AssistantResponse::synthetic(msg));
            }
        };

        parse_response(&text).map_err(|e| {
            warn!(error = %format!("{e:#}"), chars = text.len(), "unparseable reply");
            render::failure(PARSE_FAILURE);
            AssistantResponse::synthetic(PARSE_FAILURE)
        })
    }

    /// Normalize each edit's path and make sure its file is in context.
    /// Edits that fail either step are dropped; the rest keep going.
    fn validate_edits(
        &mut self,
        requested: Vec<FileEditRequest>,
        report: &mut TurnReport,
    ) -> Vec<FileEditRequest> {
        let mut kept = Vec::with_capacity(requested.len());
        for mut edit in requested {
            let loaded = normalize_path(&edit.path).and_then(|path| {
                self.conversation.add_file_context(&path)?;
                Ok(path)
            });
            match loaded {
                Ok(path) => {
                    edit.path = path.display().to_string();
                    kept.push(edit);
                }
                Err(e) => {
                    warn!(path = %edit.path, error = %e, "dropping edit");
                    render::warning(&format!("Skipping edit for '{}': {e}", edit.path));
                    report.dropped.push(edit.path);
                }
            }
        }
        kept
    }

    fn apply_creation(&mut self, request: &FileCreateRequest, report: &mut TurnReport) {
        let created = normalize_path(&request.path).and_then(|path| {
            create_file(&mut self.conversation, &path, &request.content)?;
            Ok(path)
        });
        match created {
            Ok(path) => {
                render::success(&format!("Created/updated file at '{}'", path.display()));
                report.created.push(path);
            }
            Err(e) => {
                render::failure(&format!("Error creating file: {e}"));
                report.failed.push(PathBuf::from(&request.path));
            }
        }
    }

    fn apply_edit(&mut self, edit: &FileEditRequest, report: &mut TurnReport) {
        let path = Path::new(&edit.path);
        match apply_diff_edit(
            &mut self.conversation,
            path,
            &edit.original_snippet,
            &edit.new_snippet,
        ) {
            Ok(EditOutcome::Applied) => {
                render::success(&format!("Applied diff edit to '{}'", path.display()));
                report.applied.push(path.to_path_buf());
            }
            Ok(EditOutcome::SnippetNotFound { actual }) => {
                render::warning(&format!(
                    "Original snippet not found in '{}'. No changes made.",
                    path.display()
                ));
                render::snippet_mismatch(&edit.original_snippet, &actual);
                report.unmatched.push(path.to_path_buf());
            }
            Err(e) => {
                render::failure(&format!("Error applying diff edit: {e}"));
                report.failed.push(path.to_path_buf());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;

    use anyhow::anyhow;
    use serde_json::json;

    use super::*;
    use crate::conversation::{ChatMessage, file_marker};
    use crate::paths::backup_path;

    struct ScriptedBackend {
        replies: RefCell<VecDeque<Result<String>>>,
        requests: RefCell<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            on_fragment: &mut dyn FnMut(&str),
        ) -> Result<String> {
            self.requests.borrow_mut().push(messages.to_vec());
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))?;
            for piece in reply.as_bytes().chunks(5) {
                on_fragment(&String::from_utf8_lossy(piece));
            }
            Ok(reply)
        }
    }

    struct ScriptedPrompter(VecDeque<String>);

    impl ScriptedPrompter {
        fn new(answers: &[&str]) -> Self {
            Self(answers.iter().map(|s| s.to_string()).collect())
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, _label: &str) -> Result<Option<String>> {
            Ok(self.0.pop_front())
        }
    }

    fn session(
        replies: Vec<Result<String>>,
        answers: &[&str],
    ) -> ChatSession<ScriptedBackend, ScriptedPrompter> {
        ChatSession::new(
            "sys",
            ScriptedBackend::new(replies),
            ScriptedPrompter::new(answers),
        )
    }

    fn path_str(p: &Path) -> String {
        p.display().to_string()
    }

    #[test]
    fn local_commands_are_case_insensitive() {
        assert_eq!(
            parse_local_command("  /ADD  src/Main.rs "),
            Some(LocalCommand::Add("src/Main.rs"))
        );
        assert_eq!(parse_local_command("/add"), Some(LocalCommand::Add("")));
        assert_eq!(parse_local_command("/Files"), Some(LocalCommand::Files));
        assert_eq!(parse_local_command("/address the bug"), None);
        assert_eq!(parse_local_command("add a.py"), None);
    }

    #[test]
    fn exit_keywords() {
        assert!(is_exit("exit"));
        assert!(is_exit("  QUIT "));
        assert!(!is_exit("exit now"));
    }

    #[tokio::test]
    async fn exit_ends_session_without_remote_call() {
        for word in ["exit", "Quit"] {
            let mut s = session(vec![], &["", word, "should not be read"]);
            s.run().await.unwrap();
            assert_eq!(s.backend.calls(), 0);
            assert_eq!(s.prompter.0.len(), 1);
        }
    }

    #[tokio::test]
    async fn add_command_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "remember").unwrap();
        let add = format!("/add {}", file.display());

        let mut s = session(vec![], &[&add, &add, "exit"]);
        s.run().await.unwrap();

        assert_eq!(s.backend.calls(), 0);
        assert_eq!(s.conversation().files_in_context(), &[file]);
        assert_eq!(s.conversation().len(), 2);
    }

    #[tokio::test]
    async fn edit_batch_skips_missing_file_and_applies_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.py");
        let missing = dir.path().join("two.py");
        let third = dir.path().join("three.py");
        fs::write(&first, "a = 1\n").unwrap();
        fs::write(&third, "c = 3\n").unwrap();

        let reply = json!({
            "assistant_reply": "bumping values",
            "files_to_edit": [
                {"path": path_str(&first), "original_snippet": "a = 1", "new_snippet": "a = 10"},
                {"path": path_str(&missing), "original_snippet": "b = 2", "new_snippet": "b = 20"},
                {"path": path_str(&third), "original_snippet": "c = 3", "new_snippet": "c = 30"}
            ]
        });
        let mut s = session(vec![Ok(reply.to_string())], &["y"]);
        let report = s.run_turn("bump the numbers").await.unwrap();

        assert_eq!(report.reply, "bumping values");
        assert_eq!(report.applied, vec![first.clone(), third.clone()]);
        assert_eq!(report.dropped, vec![path_str(&missing)]);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_to_string(&first).unwrap(), "a = 10\n");
        assert_eq!(fs::read_to_string(&third).unwrap(), "c = 30\n");
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn unmatched_snippet_leaves_file_and_backup_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.py");
        let good = dir.path().join("good.py");
        fs::write(&stale, "x = 1\n").unwrap();
        fs::write(&good, "y = 1\n").unwrap();

        let reply = json!({
            "assistant_reply": "two edits",
            "files_to_edit": [
                {"path": path_str(&stale), "original_snippet": "x = 99", "new_snippet": "x = 2"},
                {"path": path_str(&good), "original_snippet": "y = 1", "new_snippet": "y = 2"}
            ]
        });
        let mut s = session(vec![Ok(reply.to_string())], &["y"]);
        let report = s.run_turn("fix both").await.unwrap();

        assert_eq!(report.unmatched, vec![stale.clone()]);
        assert_eq!(report.applied, vec![good.clone()]);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_to_string(&stale).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(backup_path(&stale)).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(&good).unwrap(), "y = 2\n");
        assert!(!backup_path(&good).exists());
    }

    #[tokio::test]
    async fn anything_but_lowercase_y_declines_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("keep.md");
        fs::write(&file, "# Title\n").unwrap();
        let reply = json!({
            "files_to_edit": [
                {"path": path_str(&file), "original_snippet": "Title", "new_snippet": "Other"}
            ]
        });

        for answer in ["Y", "yes", "n", ""] {
            let mut s = session(vec![Ok(reply.to_string())], &[answer]);
            let report = s.run_turn("rename the title").await.unwrap();
            assert!(report.edits_declined);
            assert!(report.applied.is_empty());
            assert_eq!(fs::read_to_string(&file).unwrap(), "# Title\n");
        }
    }

    #[tokio::test]
    async fn creations_apply_without_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pkg").join("mod").join("new.txt");
        let reply = json!({
            "assistant_reply": "created",
            "files_to_create": [{"path": path_str(&target), "content": "fresh"}]
        });

        let mut s = session(vec![Ok(reply.to_string())], &[]);
        let report = s.run_turn("make a file").await.unwrap();

        assert_eq!(report.created, vec![target.clone()]);
        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh");
        assert!(s.conversation().contains_file(&target));
    }

    #[tokio::test]
    async fn remote_failure_becomes_synthetic_reply() {
        let mut s = session(vec![Err(anyhow!("connection refused"))], &[]);
        let report = s.run_turn("hello").await.unwrap();

        assert_eq!(report.reply, "Remote API error: connection refused");
        assert_eq!(report, TurnReport { reply: report.reply.clone(), ..TurnReport::default() });
        let last = s.conversation().messages().last().unwrap();
        assert_eq!(last.role, Role::User);
    }

    #[tokio::test]
    async fn unparseable_reply_attempts_no_operations() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never.txt");
        let truncated = format!(
            "{{\"files_to_create\": [{{\"path\": \"{}\", \"content\": \"x\"",
            path_str(&target)
        );

        let mut s = session(vec![Ok(truncated)], &[]);
        let report = s.run_turn("go").await.unwrap();

        assert_eq!(report.reply, PARSE_FAILURE);
        assert!(report.created.is_empty());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn mentioned_files_are_sent_before_the_question() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("style.css");
        fs::write(&file, "body {}").unwrap();
        let question = format!("why is {} empty? also see nothing/here.css", file.display());

        let reply = json!({"assistant_reply": "it only has a body rule"});
        let mut s = session(vec![Ok(reply.to_string())], &[]);
        let report = s.run_turn(&question).await.unwrap();
        assert_eq!(report.reply, "it only has a body rule");

        let requests = s.backend.requests.borrow();
        let sent = &requests[0];
        assert_eq!(sent.len(), 3);
        assert!(sent[1].content.starts_with(&file_marker(&file)));
        assert_eq!(sent[2], ChatMessage::new(Role::User, question.clone()));

        let messages = s.conversation().messages();
        assert_eq!(
            messages.last().unwrap(),
            &ChatMessage::new(Role::Assistant, "it only has a body rule")
        );
    }

    #[tokio::test]
    async fn turn_errors_do_not_end_the_session() {
        let reply = json!({"assistant_reply": "second try worked"});
        let mut s = session(
            vec![Err(anyhow!("timeout")), Ok(reply.to_string())],
            &["first", "second", "exit"],
        );
        s.run().await.unwrap();

        assert_eq!(s.backend.calls(), 2);
        let messages = s.conversation().messages();
        assert_eq!(
            messages.last().unwrap(),
            &ChatMessage::new(Role::Assistant, "second try worked")
        );
    }
}
