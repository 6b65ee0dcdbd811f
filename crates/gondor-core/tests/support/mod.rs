#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use git2::{IndexAddOption, Oid, Repository, Signature};
use serde_json::Value;
use tempfile::TempDir;

use gondor_core::commands::CommandContext;
use gondor_core::config::Project;
use gondor_core::error::{GondorError, GondorResult};
use gondor_core::report::{Reporter, StepMarker};
use gondor_core::task::PollSettings;
use gondor_core::transport::{ApiResponse, CancelToken, FormFields, RemoteApi, Upload};

// -----------------------------------------------------------------------------
// Git fixtures
// -----------------------------------------------------------------------------

pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Gondor Test", "test@example.com").unwrap();

    match repo.head() {
        Ok(head) => {
            let parent = repo.find_commit(head.target().unwrap()).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                .unwrap()
        }
        Err(_) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}

/// A git repository whose `mysite/` subdirectory is a configured project.
pub struct ProjectFixture {
    pub temp: TempDir,
    pub repo: Repository,
    pub head: Oid,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self::with_includes(&[])
    }

    pub fn with_includes(includes: &[&str]) -> Self {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();

        let project = temp.path().join("mysite");
        fs::create_dir_all(project.join(".gondor")).unwrap();
        fs::write(project.join("__init__.py"), "").unwrap();
        fs::write(project.join("manage.py"), "#!/usr/bin/env python\n").unwrap();
        fs::write(project.join("settings.py"), "DEBUG = True\n").unwrap();
        fs::write(
            project.join(".gondor").join("config"),
            project_config(includes),
        )
        .unwrap();
        let head = commit_all(&repo, "initial");

        Self { temp, repo, head }
    }

    pub fn repo_root(&self) -> &Path {
        self.temp.path()
    }

    pub fn project_root(&self) -> PathBuf {
        self.temp.path().join("mysite")
    }

    pub fn project(&self) -> Project {
        Project::discover(&self.project_root()).unwrap()
    }

    /// Files left in the repository root that look like deploy archives.
    pub fn leftover_archives(&self) -> Vec<String> {
        fs::read_dir(self.repo_root())
            .unwrap()
            .filter_map(|entry| {
                let name = entry.unwrap().file_name().to_string_lossy().into_owned();
                (name.ends_with(".tar") || name.ends_with(".tar.gz")).then_some(name)
            })
            .collect()
    }
}

pub fn project_config(includes: &[&str]) -> String {
    let include = includes
        .iter()
        .map(|path| format!("\"{path}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"[gondor]
site_key = "abcdefghijkl"
vcs = "git"
endpoint = "http://gondor.test/"

[app]
requirements_file = "requirements.txt"
wsgi_entry_point = "deploy.wsgi"
migrations = "none"
staticfiles = "off"

[files]
include = [{include}]
"#
    )
}

// -----------------------------------------------------------------------------
// Scripted API
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub field: String,
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub fields: FormFields,
    pub upload: Option<RecordedUpload>,
}

/// `RemoteApi` that answers from a script and records every request.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<VecDeque<GondorResult<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    /// Fire the upload's cancel token after the first chunk
    interrupt_uploads: bool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupting() -> Self {
        Self {
            interrupt_uploads: true,
            ..Self::default()
        }
    }

    pub fn reply(self, value: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn fail(self, error: GondorError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn serve(self, url: &str, body: Vec<u8>) -> Self {
        self.downloads.lock().unwrap().insert(url.to_string(), body);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.path).collect()
    }

    fn answer(&self, path: &str, fields: &FormFields, upload: Option<RecordedUpload>) -> GondorResult<ApiResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            fields: fields.clone(),
            upload,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request to {path}"));
        ApiResponse::from_value(reply?)
    }

    fn read_upload(&self, upload: &Upload) -> GondorResult<RecordedUpload> {
        let (mut reader, _length) = upload.open()?;
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(n) => n,
                Err(_) if upload.cancel.is_cancelled() => return Err(GondorError::Interrupted),
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
            if self.interrupt_uploads {
                assert!(upload.cancel.is_armed(), "uploads must arm the cancel token");
                upload.cancel.cancel();
            }
        }
        Ok(RecordedUpload {
            field: upload.field.clone(),
            file_name: upload.file_name.clone(),
            path: upload.path.clone(),
            bytes,
        })
    }
}

impl RemoteApi for FakeApi {
    fn post_form(&self, path: &str, fields: &FormFields) -> GondorResult<ApiResponse> {
        self.answer(path, fields, None)
    }

    fn post_multipart(
        &self,
        path: &str,
        fields: &FormFields,
        upload: Option<Upload>,
    ) -> GondorResult<ApiResponse> {
        let recorded = match &upload {
            Some(upload) => Some(self.read_upload(upload)?),
            None => None,
        };
        self.answer(path, fields, recorded)
    }

    fn download(&self, url: &str) -> GondorResult<Box<dyn Read + Send>> {
        let body = self
            .downloads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected download of {url}"));
        Ok(Box::new(Cursor::new(body)))
    }
}

// -----------------------------------------------------------------------------
// Reporter
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin(String),
    End(StepMarker),
    Line(String),
    Progress(u64, u64),
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
    /// Cancel this token when a step with the given text begins
    cancel_on: Option<(String, CancelToken)>,
}

impl RecordingReporter {
    /// Reporter that behaves like a user pressing Ctrl-C as `step` starts.
    pub fn cancelling_on(step: &str, cancel: CancelToken) -> Self {
        Self {
            cancel_on: Some((step.to_string(), cancel)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Steps as the terminal would show them, progress omitted.
    pub fn transcript(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut open: Option<String> = None;
        for event in self.events() {
            match event {
                Event::Begin(text) => open = Some(text),
                Event::End(marker) => {
                    lines.push(format!("{}[{}]", open.take().unwrap_or_default(), marker.as_str()))
                }
                Event::Line(text) => lines.push(text),
                Event::Progress(..) => {}
            }
        }
        lines
    }

    pub fn progress(&self) -> Vec<(u64, u64)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Progress(sent, total) => Some((sent, total)),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn begin(&self, text: &str) {
        self.events.lock().unwrap().push(Event::Begin(text.to_string()));
        if let Some((step, cancel)) = &self.cancel_on
            && step == text
        {
            assert!(cancel.is_armed(), "'{step}' must run with the cancel token armed");
            cancel.cancel();
        }
    }

    fn end(&self, marker: StepMarker) {
        self.events.lock().unwrap().push(Event::End(marker));
    }

    fn line(&self, text: &str) {
        self.events.lock().unwrap().push(Event::Line(text.to_string()));
    }

    fn progress(&self, sent: u64, total: u64) {
        self.events.lock().unwrap().push(Event::Progress(sent, total));
    }
}

pub fn context(project: Project, api: &Arc<FakeApi>, reporter: &Arc<RecordingReporter>) -> CommandContext {
    CommandContext::new(project, api.clone(), reporter.clone())
        .with_poll_settings(PollSettings::without_sleep())
}

pub fn context_with_cancel(
    project: Project,
    api: &Arc<FakeApi>,
    reporter: &Arc<RecordingReporter>,
    cancel: CancelToken,
) -> CommandContext {
    context(project, api, reporter).with_cancel_token(cancel)
}
