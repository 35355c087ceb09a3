//! Per-session application state and event dispatcher
//!
//! Every interaction is an [`Event`]. [`SessionContext::handle`] applies it,
//! turns any error into a [`Notice`], and returns the freshly rendered
//! [`View`]. Nothing here is shared between sessions; the credential store is
//! passed in by the caller.

use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{AuthState, CredentialStore, Identity, ResetFlow, Session};
use crate::chart::{forecast_chart, metric_chart, Chart};
use crate::data::{ColumnKinds, Table, UploadedFile};
use crate::error::{Error, Result};
use crate::forecast::{
    run_forecast, ForecastRequest, ForecastResult, DEFAULT_HORIZON, MAX_HORIZON, MIN_HORIZON,
};
use crate::insights::{insights, Report};

/// Rows shown in the dashboard preview
pub const PREVIEW_ROWS: usize = 5;

/// Something the user did
#[derive(Debug, Clone)]
pub enum Event {
    Login {
        email: String,
        secret: String,
    },
    SignUp {
        email: String,
        display_name: String,
        secret: String,
    },
    RequestReset,
    VerifyResetEmail {
        email: String,
    },
    SubmitNewSecret {
        secret: String,
    },
    Logout,
    /// Raw file name and contents for each uploaded file
    Upload(Vec<(String, Vec<u8>)>),
    /// Files the caller already parsed
    AddFiles(Vec<UploadedFile>),
    SelectFile {
        name: String,
    },
    GenerateChart {
        metric: String,
    },
    GenerateForecast(ForecastRequest),
}

/// One-line feedback for the last event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "snake_case")]
pub enum Notice {
    Success(String),
    Info(String),
    Error(String),
}

/// Last forecast with everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPanel {
    pub request: ForecastRequest,
    pub result: ForecastResult,
    pub chart: Chart,
    pub insights: Vec<String>,
}

/// File list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub fingerprint: String,
    pub size: usize,
    pub rows: usize,
    pub columns: usize,
}

impl From<&UploadedFile> for FileSummary {
    fn from(file: &UploadedFile) -> Self {
        Self {
            name: file.name.clone(),
            fingerprint: file.fingerprint.clone(),
            size: file.size,
            rows: file.table.len(),
            columns: file.table.columns().len(),
        }
    }
}

/// Forecast horizon slider settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HorizonBounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

/// Selected file details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedFile {
    pub name: String,
    pub preview: Table,
    pub columns: ColumnKinds,
    /// At least one numeric column
    pub can_chart: bool,
    /// At least one numeric and one other column
    pub can_forecast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user: Identity,
    pub files: Vec<FileSummary>,
    pub selected: Option<SelectedFile>,
    pub horizon: HorizonBounds,
    pub chart: Option<Chart>,
    pub forecast: Option<ForecastPanel>,
}

/// What the screen shows, derived purely from session state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum View {
    /// Login / sign-up forms
    Auth,
    /// Enter the registered email
    ForgotPassword,
    /// Enter a new secret for the verified email
    ResetPassword { email: String },
    Dashboard(Box<Dashboard>),
}

/// Session state a forecast was started from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastTicket {
    owner: String,
    file: String,
    fingerprint: String,
}

/// Table to fit on and the ticket to hand back with the result
#[derive(Debug, Clone)]
pub struct ForecastInput {
    pub table: Table,
    pub ticket: ForecastTicket,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub notice: Option<Notice>,
    pub view: View,
}

/// Everything one browser session owns
#[derive(Debug, Clone)]
pub struct SessionContext {
    session: Session,
    files: Vec<UploadedFile>,
    selected: Option<usize>,
    chart: Option<Chart>,
    forecast: Option<ForecastPanel>,
    notice: Option<Notice>,
    default_horizon: usize,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON)
    }
}

impl SessionContext {
    pub fn new(default_horizon: usize) -> Self {
        Self {
            session: Session::new(),
            files: Vec::new(),
            selected: None,
            chart: None,
            forecast: None,
            notice: None,
            default_horizon: default_horizon.clamp(MIN_HORIZON, MAX_HORIZON),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn selected_file(&self) -> Option<&UploadedFile> {
        self.selected.and_then(|i| self.files.get(i))
    }

    pub fn forecast(&self) -> Option<&ForecastPanel> {
        self.forecast.as_ref()
    }

    /// Notice from the most recent event
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Apply an event and render the result. Errors become an error notice.
    pub fn handle(&mut self, store: &dyn CredentialStore, event: Event) -> Outcome {
        let result = self.apply(store, event);
        self.settle(result).unwrap_or_else(|_| self.outcome())
    }

    /// Like [`handle`](Self::handle), but a rejected event is also returned
    /// as the error itself. The error notice is recorded either way.
    pub fn try_handle(&mut self, store: &dyn CredentialStore, event: Event) -> Result<Outcome> {
        let result = self.apply(store, event);
        self.settle(result)
    }

    fn settle(&mut self, result: Result<Option<Notice>>) -> Result<Outcome> {
        match result {
            Ok(notice) => {
                self.notice = notice;
                Ok(self.outcome())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Record a rejection that happened outside [`handle`](Self::handle)
    /// and hand the error back.
    pub fn reject(&mut self, err: Error) -> Error {
        debug!(kind = err.kind(), "Event rejected: {}", err);
        self.notice = Some(Notice::Error(err.user_message()));
        err
    }

    fn outcome(&self) -> Outcome {
        Outcome {
            notice: self.notice.clone(),
            view: self.render(),
        }
    }

    fn apply(&mut self, store: &dyn CredentialStore, event: Event) -> Result<Option<Notice>> {
        match event {
            Event::Login { email, secret } => {
                self.session.login(store, &email, &secret)?;
                Ok(Some(Notice::Success("Login successful".into())))
            }
            Event::SignUp {
                email,
                display_name,
                secret,
            } => {
                self.session.sign_up(store, &email, &display_name, &secret)?;
                Ok(Some(Notice::Success(
                    "Account created successfully. Please login.".into(),
                )))
            }
            Event::RequestReset => {
                self.session.request_reset()?;
                Ok(None)
            }
            Event::VerifyResetEmail { email } => {
                self.session.verify(store, &email)?;
                Ok(Some(Notice::Success(
                    "Email verified. Set new password.".into(),
                )))
            }
            Event::SubmitNewSecret { secret } => {
                self.session.submit(store, &secret)?;
                Ok(Some(Notice::Success(
                    "Password updated successfully. Please login.".into(),
                )))
            }
            Event::Logout => {
                self.session.logout()?;
                self.clear_workspace();
                Ok(Some(Notice::Info("Logged out".into())))
            }
            Event::Upload(files) => {
                self.check_upload()?;
                let parsed = UploadedFile::parse_batch(&files)?;
                self.add_files(parsed)
            }
            Event::AddFiles(files) => self.add_files(files),
            Event::SelectFile { name } => {
                self.select(&name)?;
                Ok(None)
            }
            Event::GenerateChart { metric } => {
                self.require_login()?;
                let chart = metric_chart(&self.require_selected()?.table, &metric)?;
                self.chart = Some(chart);
                Ok(None)
            }
            Event::GenerateForecast(request) => {
                let input = self.forecast_input(&request)?;
                let result = run_forecast(&input.table, &request);
                self.store_forecast(request, result)
            }
        }
    }

    fn require_login(&self) -> Result<&Identity> {
        self.session
            .identity()
            .ok_or_else(|| Error::InvalidState("Please login first".into()))
    }

    fn require_selected(&self) -> Result<&UploadedFile> {
        self.selected_file()
            .ok_or_else(|| Error::InvalidState("No file selected".into()))
    }

    fn clear_workspace(&mut self) {
        self.files.clear();
        self.selected = None;
        self.chart = None;
        self.forecast = None;
    }

    /// Whether files may be uploaded right now
    pub fn check_upload(&self) -> Result<()> {
        self.require_login().map(|_| ())
    }

    fn add_files(&mut self, parsed: Vec<UploadedFile>) -> Result<Option<Notice>> {
        self.require_login()?;
        if parsed.is_empty() {
            return Err(Error::InvalidInput("No files uploaded".into()));
        }

        let count = parsed.len();
        for file in parsed {
            info!(
                name = %file.name,
                rows = file.table.len(),
                columns = file.table.columns().len(),
                "File uploaded"
            );
            match self.files.iter().position(|f| f.name == file.name) {
                Some(i) => {
                    self.files[i] = file;
                    if self.selected == Some(i) {
                        self.chart = None;
                        self.forecast = None;
                    }
                }
                None => self.files.push(file),
            }
        }
        if self.selected.is_none() {
            self.selected = Some(0);
        }

        Ok(Some(Notice::Success(format!("Uploaded {} file(s)", count))))
    }

    fn select(&mut self, name: &str) -> Result<()> {
        self.require_login()?;
        let idx = self
            .files
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| Error::NotFound(format!("No uploaded file named {}", name)))?;

        if self.selected != Some(idx) {
            self.selected = Some(idx);
            self.chart = None;
            self.forecast = None;
        }
        Ok(())
    }

    /// Check a forecast can run and hand out the table to fit on.
    ///
    /// Split from [`finish_forecast`](Self::finish_forecast) so callers can fit
    /// without holding the context.
    pub fn forecast_input(&self, request: &ForecastRequest) -> Result<ForecastInput> {
        let owner = self.require_login()?.email.clone();
        let file = self.require_selected()?;
        let kinds = file.table.classify_columns();
        if !kinds.numeric.contains(&request.value_column) {
            return Err(Error::InvalidInput(format!(
                "Value column must be numeric: {}",
                request.value_column
            )));
        }
        Ok(ForecastInput {
            table: file.table.clone(),
            ticket: ForecastTicket {
                owner,
                file: file.name.clone(),
                fingerprint: file.fingerprint.clone(),
            },
        })
    }

    fn current_ticket(&self) -> Option<ForecastTicket> {
        let identity = self.session.identity()?;
        let file = self.selected_file()?;
        Some(ForecastTicket {
            owner: identity.email.clone(),
            file: file.name.clone(),
            fingerprint: file.fingerprint.clone(),
        })
    }

    /// Record the outcome of a forecast started with [`forecast_input`](Self::forecast_input).
    ///
    /// The result is discarded if the user or the selected file changed
    /// since the ticket was issued.
    pub fn finish_forecast(
        &mut self,
        ticket: &ForecastTicket,
        request: ForecastRequest,
        result: Result<ForecastResult>,
    ) -> Result<Outcome> {
        let stored = if self.current_ticket().as_ref() == Some(ticket) {
            self.store_forecast(request, result)
        } else {
            info!(file = %ticket.file, "Discarding forecast for a changed session");
            Err(Error::InvalidState(
                "Session changed while the forecast was running".into(),
            ))
        };
        self.settle(stored)
    }

    fn store_forecast(
        &mut self,
        request: ForecastRequest,
        result: Result<ForecastResult>,
    ) -> Result<Option<Notice>> {
        let result = result?;
        let chart = forecast_chart(&result, &request.value_column);
        let insights = insights(&result.historical_values(), &result.sarima_values());
        self.forecast = Some(ForecastPanel {
            request,
            result,
            chart,
            insights,
        });
        Ok(None)
    }

    /// Uploaded files, in upload order
    pub fn file_summaries(&self) -> Result<Vec<FileSummary>> {
        self.require_login()?;
        Ok(self.files.iter().map(FileSummary::from).collect())
    }

    /// First `rows` rows of the selected file
    pub fn preview(&self, rows: usize) -> Result<Table> {
        self.require_login()?;
        Ok(self.require_selected()?.table.head(rows))
    }

    /// Downloadable report for the last forecast
    pub fn report(&self) -> Result<Report> {
        self.require_login()?;
        self.forecast
            .as_ref()
            .map(|panel| Report::new(panel.insights.clone()))
            .ok_or_else(|| Error::NotFound("No forecast has been generated".into()))
    }

    /// Current view
    pub fn render(&self) -> View {
        let identity = match &self.session.auth {
            AuthState::LoggedIn { identity } => identity,
            AuthState::LoggedOut => {
                return match &self.session.reset {
                    ResetFlow::Inactive => View::Auth,
                    ResetFlow::AwaitingEmailVerification => View::ForgotPassword,
                    ResetFlow::AwaitingNewSecret { email } => View::ResetPassword {
                        email: email.clone(),
                    },
                }
            }
        };

        let selected = self.selected_file().map(|file| {
            let columns = file.table.classify_columns();
            SelectedFile {
                name: file.name.clone(),
                preview: file.table.head(PREVIEW_ROWS),
                can_chart: !columns.numeric.is_empty(),
                can_forecast: !columns.numeric.is_empty() && !columns.other.is_empty(),
                columns,
            }
        });

        View::Dashboard(Box::new(Dashboard {
            user: identity.clone(),
            files: self.files.iter().map(FileSummary::from).collect(),
            selected,
            horizon: HorizonBounds {
                min: MIN_HORIZON,
                max: MAX_HORIZON,
                default: self.default_horizon,
            },
            chart: self.chart.clone(),
            forecast: self.forecast.clone(),
        }))
    }
}
