/// Dashboard controller
///
/// Owns the injected table, the auto-mode selector and the telemetry poll
/// task. The GUI only renders `DashboardView` and sends `DashboardCommand`s,
/// so every behaviour here runs without a window.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::alliance::{AllianceColor, Rgb};
use crate::auto_mode::{AutoMode, AutoModeSelector};
use crate::periodic::{CancellationToken, PeriodicTask};
use crate::remote_table::RemoteTable;
use crate::telemetry::{format_alliance, format_speed, TelemetryPoller, TelemetrySnapshot, ALLIANCE_KEY};

pub const SELECTED_AUTO_KEY: &str = "selectedAuto";
pub const MOTOR_POWER_KEY: &str = "motorPower";

/// Button/form actions, one per UI control
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    SelectAuto(AutoMode),
    SubmitMotorPower(String),
    SubmitAlliance(AllianceColor),
    ToggleAlliance,
}

/// Everything the window shows
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub displayed_asset: AutoMode,
    pub status: String,
    pub speed_text: String,
    pub alliance_text: String,
    /// (foreground, background) of the alliance label
    pub alliance_colors: (Rgb, Rgb),
    pub last_motor_power: Option<f64>,
    pub last_update: Option<DateTime<Local>>,
}

impl Default for DashboardView {
    fn default() -> Self {
        let selector = AutoModeSelector::new();
        Self {
            displayed_asset: selector.selected(),
            status: selector.status_text(),
            speed_text: format_speed(0.0),
            alliance_text: format_alliance(AllianceColor::Unknown),
            alliance_colors: AllianceColor::Unknown.color_pair(),
            last_motor_power: None,
            last_update: None,
        }
    }
}

/// Parse motor power entry text. Non-finite numbers are rejected too.
pub fn parse_motor_power(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub struct DashboardController<T: RemoteTable> {
    table: T,
    selector: AutoModeSelector,
    poller: TelemetryPoller,
    poll_task: PeriodicTask,
    alliance_choice: AllianceColor,
    snapshot: Option<TelemetrySnapshot>,
    view: DashboardView,
}

impl<T: RemoteTable> DashboardController<T> {
    pub fn new(table: T, poll_period: Duration, token: CancellationToken) -> Self {
        Self {
            table,
            selector: AutoModeSelector::new(),
            poller: TelemetryPoller::new(),
            poll_task: PeriodicTask::new(poll_period, token),
            alliance_choice: AllianceColor::default(),
            snapshot: None,
            view: DashboardView::default(),
        }
    }

    /// Arm the telemetry poll; the first tick runs one period after `now`
    pub fn start(&mut self, now: Instant) {
        info!(target: "dashboard", "Telemetry polling every {} ms", self.poll_task.period().as_millis());
        self.poll_task.start(now);
    }

    pub fn handle(&mut self, command: DashboardCommand) {
        match command {
            DashboardCommand::SelectAuto(mode) => self.select_auto(mode),
            DashboardCommand::SubmitMotorPower(text) => {
                self.set_motor_power(&text);
            }
            DashboardCommand::SubmitAlliance(color) => self.set_alliance(color),
            DashboardCommand::ToggleAlliance => {
                self.toggle_alliance();
            }
        }
    }

    /// Show the mode's preview image and status, and publish its identifier
    pub fn select_auto(&mut self, mode: AutoMode) {
        self.selector.select(mode);
        self.view.displayed_asset = mode;
        self.view.status = self.selector.status_text();
        self.table.put_string(SELECTED_AUTO_KEY, mode.identifier());
        info!(target: "dashboard", "Auto selected: {} ({})", mode.label(), mode.identifier());
    }

    /// Publish the entry text as motor power if it is a number. Anything
    /// else is dropped without touching the table or the view.
    pub fn set_motor_power(&mut self, text: &str) -> Option<f64> {
        match parse_motor_power(text) {
            Some(power) => {
                self.table.put_number(MOTOR_POWER_KEY, power);
                self.view.last_motor_power = Some(power);
                info!(target: "dashboard", "Motor power set to {}", power);
                Some(power)
            }
            None => {
                debug!(target: "dashboard", "Ignoring motor power entry '{}': not a number", text);
                None
            }
        }
    }

    pub fn set_alliance(&mut self, color: AllianceColor) {
        self.alliance_choice = color;
        self.table.put_string(ALLIANCE_KEY, color.as_str());
        info!(target: "dashboard", "Alliance set to {}", color);
    }

    pub fn toggle_alliance(&mut self) -> AllianceColor {
        let next = self.alliance_choice.toggled();
        self.set_alliance(next);
        next
    }

    /// Run a telemetry tick if one is due. Returns whether it ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.poll_task.poll(now) {
            return false;
        }
        self.tick();
        true
    }

    /// Read telemetry now and replace the displayed values
    pub fn tick(&mut self) {
        let snapshot = self.poller.read(&self.table);
        self.view.speed_text = snapshot.speed_text();
        self.view.alliance_text = snapshot.alliance_text();
        self.view.alliance_colors = snapshot.alliance_color.color_pair();
        self.view.last_update = Some(snapshot.received_at);
        self.snapshot = Some(snapshot);
    }

    pub fn time_until_next_poll(&self, now: Instant) -> Option<Duration> {
        self.poll_task.time_until_due(now)
    }

    pub fn poll_ticks(&self) -> u64 {
        self.poll_task.ticks()
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn selected_auto(&self) -> AutoMode {
        self.selector.selected()
    }

    pub fn alliance_choice(&self) -> AllianceColor {
        self.alliance_choice
    }

    pub fn snapshot(&self) -> Option<&TelemetrySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alliance::{BLACK, RED, WHITE};
    use crate::remote_table::testing::RecordingTable;
    use crate::remote_table::TableValue;
    use crate::telemetry::SPEED_KEY;

    const PERIOD: Duration = Duration::from_millis(100);

    fn controller() -> DashboardController<RecordingTable> {
        DashboardController::new(RecordingTable::new(), PERIOD, CancellationToken::new())
    }

    #[test]
    fn test_initial_state() {
        let ctl = controller();
        assert_eq!(ctl.selected_auto(), AutoMode::NoAuto);
        assert_eq!(ctl.alliance_choice(), AllianceColor::Unknown);
        assert_eq!(ctl.view().displayed_asset, AutoMode::NoAuto);
        assert!(ctl.table().writes.is_empty());
        assert!(ctl.snapshot().is_none());
    }

    #[test]
    fn test_select_each_mode_writes_once() {
        for mode in AutoMode::ALL {
            let mut ctl = controller();
            ctl.select_auto(mode);
            assert_eq!(ctl.view().displayed_asset, mode);
            assert!(ctl.view().status.contains(mode.label()));
            assert_eq!(
                ctl.table().writes_to(SELECTED_AUTO_KEY),
                vec![TableValue::String(mode.identifier().to_string())]
            );
            assert_eq!(ctl.table().writes.len(), 1);
        }
    }

    #[test]
    fn test_repeated_select_is_idempotent() {
        let mut ctl = controller();
        ctl.select_auto(AutoMode::NoAuto);
        let first = ctl.view().clone();
        ctl.select_auto(AutoMode::NoAuto);
        ctl.select_auto(AutoMode::NoAuto);
        assert_eq!(*ctl.view(), first);
        assert_eq!(ctl.table().writes_to(SELECTED_AUTO_KEY).len(), 3);
        assert_eq!(ctl.table().writes.len(), 3);
    }

    #[test]
    fn test_motor_power_valid() {
        let mut ctl = controller();
        assert_eq!(ctl.set_motor_power("12.5"), Some(12.5));
        assert_eq!(ctl.table().writes_to(MOTOR_POWER_KEY), vec![TableValue::Number(12.5)]);
        assert_eq!(ctl.table().writes.len(), 1);
    }

    #[test]
    fn test_motor_power_invalid_is_noop() {
        let mut ctl = controller();
        let before = ctl.view().clone();
        assert_eq!(ctl.set_motor_power("abc"), None);
        assert_eq!(ctl.set_motor_power(""), None);
        assert_eq!(ctl.set_motor_power("NaN"), None);
        assert!(ctl.table().writes.is_empty());
        assert_eq!(*ctl.view(), before);
    }

    #[test]
    fn test_motor_power_trims_whitespace() {
        assert_eq!(parse_motor_power(" -0.5 "), Some(-0.5));
        assert_eq!(parse_motor_power("1e1"), Some(10.0));
        assert_eq!(parse_motor_power("inf"), None);
    }

    #[test]
    fn test_set_alliance_writes_literal() {
        for color in AllianceColor::CHOICES {
            let mut ctl = controller();
            ctl.set_alliance(color);
            assert_eq!(
                ctl.table().writes_to(ALLIANCE_KEY),
                vec![TableValue::String(color.as_str().to_string())]
            );
            assert_eq!(ctl.alliance_choice(), color);
        }
    }

    #[test]
    fn test_handle_dispatches_commands() {
        let mut ctl = controller();
        ctl.handle(DashboardCommand::SelectAuto(AutoMode::RedLeave));
        ctl.handle(DashboardCommand::SubmitMotorPower("0.25".into()));
        ctl.handle(DashboardCommand::SubmitMotorPower("fast".into()));
        ctl.handle(DashboardCommand::SubmitAlliance(AllianceColor::Blue));
        let keys: Vec<&str> = ctl.table().writes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec![SELECTED_AUTO_KEY, MOTOR_POWER_KEY, ALLIANCE_KEY]);
    }

    #[test]
    fn test_toggle_alliance_writes_each_time() {
        let mut ctl = controller();
        assert_eq!(ctl.toggle_alliance(), AllianceColor::Red);
        assert_eq!(ctl.toggle_alliance(), AllianceColor::Blue);
        ctl.handle(DashboardCommand::ToggleAlliance);
        assert_eq!(
            ctl.table().writes_to(ALLIANCE_KEY),
            vec![
                TableValue::String("Red".into()),
                TableValue::String("Blue".into()),
                TableValue::String("Red".into()),
            ]
        );
    }

    #[test]
    fn test_tick_renders_speed_and_alliance() {
        let mut ctl = controller();
        ctl.table_mut().remote_set(SPEED_KEY, TableValue::Number(3.14159));
        ctl.table_mut().remote_set(ALLIANCE_KEY, TableValue::String("red".into()));
        ctl.tick();
        assert_eq!(ctl.view().speed_text, "Speed: 3.14");
        assert_eq!(ctl.view().alliance_text, "Alliance: RED");
        assert_eq!(ctl.view().alliance_colors, (WHITE, RED));
        assert!(ctl.view().last_update.is_some());
    }

    #[test]
    fn test_tick_absent_alliance_is_unknown_black() {
        let mut ctl = controller();
        ctl.tick();
        assert_eq!(ctl.view().alliance_text, "Alliance: UNKNOWN");
        assert_eq!(ctl.view().alliance_colors, (WHITE, BLACK));
    }

    #[test]
    fn test_tick_does_not_write_back() {
        let mut ctl = controller();
        ctl.set_alliance(AllianceColor::Blue);
        ctl.table_mut().remote_set(ALLIANCE_KEY, TableValue::String("RED".into()));
        ctl.tick();
        assert_eq!(ctl.view().alliance_text, "Alliance: RED");
        assert_eq!(ctl.alliance_choice(), AllianceColor::Blue);
        assert_eq!(ctl.table().writes.len(), 1);
    }

    #[test]
    fn test_poll_rearms_after_every_tick() {
        let t0 = Instant::now();
        let mut ctl = controller();
        ctl.start(t0);
        let mut ran = 0;
        for n in 1..=20u32 {
            // Alternate between a populated and an empty table
            if n % 2 == 0 {
                ctl.table_mut().remote_set(SPEED_KEY, TableValue::Number(n as f64));
            } else {
                ctl.table_mut().table.remove(SPEED_KEY);
            }
            if ctl.poll(t0 + PERIOD * n) {
                ran += 1;
            }
            assert!(!ctl.poll(t0 + PERIOD * n + Duration::from_millis(50)));
        }
        assert_eq!(ran, 20);
        assert_eq!(ctl.poll_ticks(), 20);
        assert_eq!(ctl.view().speed_text, "Speed: 20.00");
    }

    #[test]
    fn test_poll_stops_after_cancel() {
        let t0 = Instant::now();
        let token = CancellationToken::new();
        let mut ctl = DashboardController::new(RecordingTable::new(), PERIOD, token.clone());
        ctl.start(t0);
        assert!(ctl.poll(t0 + PERIOD));
        token.cancel();
        assert!(!ctl.poll(t0 + PERIOD * 2));
        assert_eq!(ctl.time_until_next_poll(t0), None);
    }
}
