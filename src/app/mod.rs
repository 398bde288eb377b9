mod state;
mod ui;

use crate::api::{ApiClient, ApiError};
use crate::config::AppConfig;
use crate::upload::{source, CandidateFile, UploadCoordinator};
use eframe::{egui, App};
use std::future::Future;
use std::path::PathBuf;
use std::sync::mpsc::{self as std_mpsc, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub use state::{
    ActionProgress, AuthForm, FilesState, NoticeKind, Notices, Page, ShareState, UploadState,
};

const IDENTITY_KEY: &str = "docvault.identity";

/// Runs `task` to completion on a fresh thread with a single-threaded runtime
/// and hands the output back over a channel.
fn spawn_task<T, F, Fut>(task: F) -> Receiver<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
{
    let (sender, receiver) = std_mpsc::channel();
    std::thread::spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => {
                let output = rt.block_on(task());
                sender.send(output).unwrap_or_default();
            }
            Err(e) => error!("Failed to start async runtime: {}", e),
        }
    });
    receiver
}

/// Non-blocking check of a task channel. A vanished worker counts as done.
fn poll<T>(receiver: &Option<Receiver<T>>) -> Option<Option<T>> {
    match receiver.as_ref()?.try_recv() {
        Ok(value) => Some(Some(value)),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(None),
    }
}

pub struct DocVaultApp {
    api: ApiClient,
    coordinator: UploadCoordinator,
    page: Page,
    remembered_identity: Option<String>,
    notices: Notices,
    upload: UploadState,
    sign_in: AuthForm,
    sign_up: AuthForm,
    files: FilesState,
    share: ShareState,
}

impl DocVaultApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, client: reqwest::Client) -> Self {
        let remembered_identity = cc
            .storage
            .and_then(|storage| storage.get_string(IDENTITY_KEY))
            .filter(|identity| !identity.trim().is_empty());

        let mut app = Self::with_identity(config, client, remembered_identity);
        if app.remembered_identity.is_some() {
            app.page = Page::Upload;
        }
        app
    }

    fn with_identity(config: AppConfig, client: reqwest::Client, remembered_identity: Option<String>) -> Self {
        info!(
            "Initializing DocVault client (API {}, {} uploads)",
            config.api_base,
            config.strategy.name()
        );

        let api = ApiClient::new(client.clone(), &config.api_base, &config.auth_base);
        let coordinator = UploadCoordinator::new(client, config.strategy, config.allow_list);

        let upload = UploadState {
            identity: remembered_identity.clone().unwrap_or_default(),
            ..UploadState::default()
        };
        let sign_in = AuthForm {
            username: remembered_identity.clone().unwrap_or_default(),
            ..AuthForm::default()
        };

        Self {
            api,
            coordinator,
            page: Page::default(),
            remembered_identity,
            notices: Notices::default(),
            upload,
            sign_in,
            sign_up: AuthForm::default(),
            files: FilesState::default(),
            share: ShareState::default(),
        }
    }

    fn identity(&self) -> Option<String> {
        let typed = self.upload.identity.trim();
        if !typed.is_empty() {
            return Some(typed.to_string());
        }
        self.remembered_identity.clone()
    }

    pub fn navigate(&mut self, page: Page) {
        if self.page == page {
            return;
        }
        self.page = page;
        if matches!(page, Page::Files | Page::Share) && self.files.loaded_for != self.identity() {
            self.refresh_files();
        }
    }

    pub fn sign_out(&mut self) {
        info!("Forgetting remembered identity");
        self.remembered_identity = None;
        self.upload.identity.clear();
        self.files = FilesState::default();
        self.share = ShareState::default();
        self.page = Page::SignIn;
    }

    pub fn submit_sign_in(&mut self) {
        if !self.sign_in.can_submit() {
            return;
        }
        let api = self.api.clone();
        let username = self.sign_in.username.trim().to_string();
        let password = self.sign_in.password.clone();
        self.sign_in.receiver = Some(spawn_task(move || async move {
            api.sign_in(&username, &password).await
        }));
    }

    pub fn submit_sign_up(&mut self) {
        if !self.sign_up.can_submit() {
            return;
        }
        let api = self.api.clone();
        let username = self.sign_up.username.trim().to_string();
        let password = self.sign_up.password.clone();
        self.sign_up.receiver = Some(spawn_task(move || async move {
            api.sign_up(&username, &password).await
        }));
    }

    pub fn add_paths(&mut self, paths: Vec<PathBuf>) {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match source::from_path(&path) {
                Ok(file) => files.push(file),
                Err(e) => self
                    .notices
                    .error(format!("Failed to read {}: {}", path.display(), e)),
            }
        }
        self.add_files(files);
    }

    pub fn add_folder(&mut self, folder: PathBuf) {
        let paths = source::collect_folder(&folder);
        info!("Found {} file(s) in {}", paths.len(), folder.display());
        self.add_paths(paths);
    }

    fn add_files(&mut self, files: Vec<CandidateFile>) {
        if files.is_empty() {
            return;
        }
        if self.upload.is_uploading {
            debug!("Ignoring {} file(s) added while a batch is in flight", files.len());
            return;
        }
        if let Some(message) = self
            .upload
            .add_candidates(files, self.coordinator.allow_list())
        {
            self.notices.error(message);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let (hovering, dropped) = ctx.input(|i| (!i.raw.hovered_files.is_empty(), i.raw.dropped_files.clone()));
        self.upload.is_dragging = hovering && self.accepts_drops();
        self.accept_drop(dropped);
    }

    fn accepts_drops(&self) -> bool {
        self.page == Page::Upload && !self.upload.is_uploading
    }

    fn accept_drop(&mut self, dropped: Vec<egui::DroppedFile>) {
        if dropped.is_empty() || !self.accepts_drops() {
            return;
        }

        let mut paths = Vec::new();
        let mut files = Vec::new();
        for file in dropped {
            if let Some(path) = file.path {
                paths.push(path);
            } else if let Some(bytes) = file.bytes {
                files.push(source::from_bytes(&file.name, bytes.to_vec()));
            }
        }
        self.add_files(files);
        self.add_paths(paths);
    }

    pub fn start_upload(&mut self) {
        if self.upload.is_uploading {
            return;
        }

        let identity = self.upload.identity.trim().to_string();
        if identity.is_empty() {
            self.notices.error("Please enter a username.");
            return;
        }
        if self.upload.selected.is_empty() {
            self.notices.error("Please select files to upload.");
            return;
        }

        let files = self.upload.selected.clone();
        info!("Starting upload of {} file(s) for '{}'", files.len(), identity);

        let (status_sender, status_receiver) = std_mpsc::channel();
        let coordinator = self.coordinator.clone().with_status_sender(status_sender);

        self.upload.begin(files.len());
        self.upload.status_receiver = Some(status_receiver);
        self.upload.report_receiver = Some(spawn_task(move || async move {
            coordinator.upload_batch(files, &identity).await
        }));
    }

    pub fn refresh_files(&mut self) {
        if self.files.is_loading() {
            return;
        }
        let Some(identity) = self.identity() else {
            self.files.error = Some("Please sign in to view your files.".to_string());
            return;
        };

        self.files.error = None;
        self.files.loaded_for = Some(identity.clone());
        let api = self.api.clone();
        self.files.receiver = Some(spawn_task(move || async move {
            api.retrieve_files(&identity).await
        }));
    }

    pub fn submit_share(&mut self) {
        if self.share.in_flight() {
            return;
        }
        let (Some(filename), Some(owner)) = (self.share.selected.clone(), self.identity()) else {
            self.notices.error("Please select a file and enter a username");
            return;
        };
        let recipient = self.share.recipient.trim().to_string();
        if recipient.is_empty() {
            self.notices.error("Please select a file and enter a username");
            return;
        }

        let api = self.api.clone();
        self.share.receiver = Some(spawn_task(move || async move {
            api.share_file(&owner, &filename, &recipient).await
        }));
    }

    pub fn update_state(&mut self) {
        while let Some(Some(status)) = poll(&self.upload.status_receiver) {
            self.upload.apply_status(status);
        }

        if let Some(report) = poll(&self.upload.report_receiver) {
            match report {
                Some(report) => {
                    while let Some(Some(status)) = poll(&self.upload.status_receiver) {
                        self.upload.apply_status(status);
                    }
                    let (success, failure) = self.upload.finish(&report);
                    if let Some(message) = success {
                        self.notices.success(message);
                    }
                    if let Some(message) = failure {
                        self.notices.error(message);
                    }
                }
                None => {
                    self.upload.abort();
                    self.notices.error("Upload failed");
                }
            }
        }

        if let Some(outcome) = poll(&self.sign_in.receiver) {
            self.sign_in.receiver = None;
            match flatten(outcome, "Login error") {
                Ok(()) => {
                    let username = self.sign_in.username.trim().to_string();
                    self.sign_in.password.clear();
                    self.upload.identity = username.clone();
                    self.remembered_identity = Some(username);
                    self.notices.success("Login successful!");
                    self.navigate(Page::Upload);
                }
                Err(message) => self.notices.error(message),
            }
        }

        if let Some(outcome) = poll(&self.sign_up.receiver) {
            self.sign_up.receiver = None;
            match flatten(outcome, "Signup error") {
                Ok(()) => {
                    self.sign_in.username = self.sign_up.username.trim().to_string();
                    self.sign_up = AuthForm::default();
                    self.notices.success("Signup successful!");
                    self.navigate(Page::SignIn);
                }
                Err(message) => self.notices.error(message),
            }
        }

        if let Some(outcome) = poll(&self.files.receiver) {
            self.files.receiver = None;
            match flatten(outcome, "Failed to load files.") {
                Ok(files) => {
                    info!("Loaded {} stored file(s)", files.len());
                    self.files.files = files;
                }
                Err(message) => {
                    self.files.files.clear();
                    self.files.error = Some(message);
                }
            }
        }

        if let Some(outcome) = poll(&self.share.receiver) {
            self.share.receiver = None;
            match flatten(outcome, "Share error") {
                Ok(()) => {
                    self.notices
                        .success(format!("File shared with {}!", self.share.recipient.trim()));
                    self.share.reset();
                }
                Err(message) => self.notices.error(message),
            }
        }

        self.notices.prune(Instant::now());
    }

    fn has_work_in_flight(&self) -> bool {
        self.upload.is_uploading
            || self.sign_in.in_flight()
            || self.sign_up.in_flight()
            || self.files.is_loading()
            || self.share.in_flight()
    }
}

fn flatten<T>(outcome: Option<Result<T, ApiError>>, lost: &str) -> Result<T, String> {
    match outcome {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(e.message().to_string()),
        None => Err(lost.to_string()),
    }
}

impl App for DocVaultApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.update_state();
        self.render(ctx);

        if self.has_work_in_flight() {
            ctx.request_repaint();
        } else if !self.notices.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        storage.set_string(
            IDENTITY_KEY,
            self.remembered_identity.clone().unwrap_or_default(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{BatchReport, FileStatus, UploadResult, UploadStatus, UploadStrategy};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn app_for(server: &Server) -> DocVaultApp {
        let config = AppConfig::from_lookup(|key| match key {
            "DOCVAULT_API_URL" => Some(server.url()),
            _ => None,
        })
        .unwrap();
        assert!(matches!(config.strategy, UploadStrategy::Indirect { .. }));
        DocVaultApp::with_identity(config, reqwest::Client::new(), None)
    }

    fn wait_until(app: &mut DocVaultApp, done: impl Fn(&DocVaultApp) -> bool) {
        for _ in 0..500 {
            app.update_state();
            if done(app) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("background task did not settle");
    }

    fn notice_texts(app: &DocVaultApp, kind: NoticeKind) -> Vec<String> {
        app.notices
            .items()
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.text.clone())
            .collect()
    }

    #[test]
    fn upload_requires_identity_and_files() {
        let server = Server::new();
        let mut app = app_for(&server);

        app.start_upload();
        assert_eq!(notice_texts(&app, NoticeKind::Error), vec!["Please enter a username."]);

        app.upload.identity = "alice".into();
        app.start_upload();
        assert_eq!(
            notice_texts(&app, NoticeKind::Error).last().map(String::as_str),
            Some("Please select files to upload.")
        );
        assert!(!app.upload.is_uploading);
    }

    #[test]
    fn upload_runs_in_background_and_reports_once_settled() {
        let mut server = Server::new();
        let base = server.url();
        server
            .mock("POST", "/upload")
            .match_body(Matcher::PartialJson(json!({ "filename": "ok.pdf" })))
            .with_status(200)
            .with_body(json!({ "uploadURL": format!("{}/bucket/ok.pdf", base) }).to_string())
            .create();
        server
            .mock("POST", "/upload")
            .match_body(Matcher::PartialJson(json!({ "filename": "no.pdf" })))
            .with_status(400)
            .with_body(json!({ "error": "File already exists" }).to_string())
            .create();
        server.mock("PUT", "/bucket/ok.pdf").with_status(200).create();

        let mut app = app_for(&server);
        app.upload.identity = "alice".into();
        app.add_files(vec![
            source::from_bytes("ok.pdf", b"1".to_vec()),
            source::from_bytes("no.pdf", b"2".to_vec()),
        ]);

        app.start_upload();
        assert!(app.upload.is_uploading);
        app.start_upload();

        wait_until(&mut app, |app| !app.upload.is_uploading);

        assert_eq!(notice_texts(&app, NoticeKind::Success), vec!["Uploaded: ok.pdf"]);
        assert_eq!(
            notice_texts(&app, NoticeKind::Error),
            vec!["Failed: no.pdf (File already exists)"]
        );
        let remaining: Vec<&str> = app.upload.selected.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(remaining, vec!["no.pdf"]);
    }

    #[test]
    fn late_statuses_are_applied_before_the_report() {
        let server = Server::new();
        let mut app = app_for(&server);
        app.upload.selected = vec![source::from_bytes("a.pdf", b"1".to_vec())];
        app.upload.begin(1);

        let (status_sender, status_receiver) = std_mpsc::channel();
        let (report_sender, report_receiver) = std_mpsc::channel();
        app.upload.status_receiver = Some(status_receiver);
        app.upload.report_receiver = Some(report_receiver);

        let result = UploadResult::Succeeded { name: "a.pdf".into() };
        status_sender
            .send(FileStatus {
                name: "a.pdf".into(),
                status: UploadStatus::Processing,
            })
            .unwrap();
        status_sender.send(result.to_status()).unwrap();
        report_sender
            .send(BatchReport {
                results: vec![result],
                rejected: Vec::new(),
            })
            .unwrap();

        app.update_state();

        assert!(!app.upload.is_uploading);
        assert_eq!(
            app.upload.file_statuses,
            vec![FileStatus {
                name: "a.pdf".into(),
                status: UploadStatus::Success,
            }]
        );
        assert!(app.upload.selected.is_empty());
    }

    #[test]
    fn drops_are_ignored_while_uploading() {
        let server = Server::new();
        let mut app = app_for(&server);
        app.page = Page::Upload;
        let dropped = || {
            vec![egui::DroppedFile {
                name: "late.pdf".into(),
                bytes: Some(b"late".to_vec().into()),
                ..Default::default()
            }]
        };

        app.upload.begin(0);
        app.accept_drop(dropped());
        assert!(app.upload.selected.is_empty());

        app.upload.abort();
        app.accept_drop(dropped());
        let names: Vec<&str> = app.upload.selected.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["late.pdf"]);
    }

    #[test]
    fn sign_in_remembers_identity() {
        let mut server = Server::new();
        server.mock("POST", "/signin").with_status(200).with_body("{}").create();
        server
            .mock("GET", "/retrieve")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "files": [] }).to_string())
            .create();

        let mut app = app_for(&server);
        app.sign_in.username = " alice ".into();
        app.sign_in.password = "pw".into();
        app.submit_sign_in();
        wait_until(&mut app, |app| !app.sign_in.in_flight());

        assert_eq!(app.remembered_identity.as_deref(), Some("alice"));
        assert_eq!(app.upload.identity, "alice");
        assert_eq!(app.page, Page::Upload);
        assert!(app.sign_in.password.is_empty());

        app.navigate(Page::Files);
        wait_until(&mut app, |app| !app.files.is_loading());
        assert!(app.files.error.is_none());
        assert_eq!(app.files.loaded_for.as_deref(), Some("alice"));

        app.sign_out();
        assert!(app.remembered_identity.is_none());
        assert_eq!(app.page, Page::SignIn);
    }

    #[test]
    fn file_listing_needs_an_identity() {
        let server = Server::new();
        let mut app = app_for(&server);
        app.navigate(Page::Files);
        assert_eq!(
            app.files.error.as_deref(),
            Some("Please sign in to view your files.")
        );
        assert!(!app.files.is_loading());
    }
}
