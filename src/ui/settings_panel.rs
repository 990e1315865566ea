//! Renders a parameter bus as an ImGui panel
//!
//! One widget per registered entry, in registration order. Widgets publish
//! into the bus; values are read back from the applied snapshot, so an
//! edit becomes visible one tick later.

use imgui::Ui;

use crate::pipeline::{DriverState, FrameDriver, ParamKind, ParamValue, ParameterBus};

/// Standard settings window for a demo. Widget edits go through
/// `publish`/`fire`; a kind mismatch here would be a registration bug, so
/// failures are logged rather than surfaced.
pub fn settings_panel(ui: &Ui, title: &str, bus: &mut ParameterBus) {
    ui.window(title)
        .size([280.0, 340.0], imgui::Condition::FirstUseEver)
        .position([10.0, 10.0], imgui::Condition::FirstUseEver)
        .build(|| {
            let snapshot: Vec<(String, String, ParamKind, ParamValue)> = bus
                .entries()
                .iter()
                .map(|e| {
                    (
                        e.name.clone(),
                        e.label.clone(),
                        e.kind.clone(),
                        e.value().clone(),
                    )
                })
                .collect();

            for (name, label, kind, value) in snapshot {
                let published = match (kind, value) {
                    (ParamKind::Number { min, max, .. }, ParamValue::Number(v)) => {
                        let mut v = v;
                        if ui.slider(&label, min, max, &mut v) {
                            Some(ParamValue::Number(v))
                        } else {
                            None
                        }
                    }
                    (ParamKind::Boolean, ParamValue::Boolean(v)) => {
                        let mut v = v;
                        if ui.checkbox(&label, &mut v) {
                            Some(ParamValue::Boolean(v))
                        } else {
                            None
                        }
                    }
                    (ParamKind::Color, ParamValue::Color(rgb)) => {
                        let mut rgb = rgb;
                        if ui.color_edit3(&label, &mut rgb) {
                            Some(ParamValue::Color(rgb))
                        } else {
                            None
                        }
                    }
                    (ParamKind::Choice { options }, ParamValue::Choice(index)) => {
                        let mut index = index;
                        if ui.combo(&label, &mut index, &options, |o| o.as_str().into()) {
                            Some(ParamValue::Choice(index))
                        } else {
                            None
                        }
                    }
                    (ParamKind::Action, _) => {
                        if ui.button(&label) {
                            if let Err(e) = bus.fire(&name) {
                                log::warn!("fire {name}: {e}");
                            }
                        }
                        None
                    }
                    // kind/value pairing is fixed at registration
                    _ => None,
                };

                if let Some(value) = published {
                    if let Err(e) = bus.publish(&name, value) {
                        log::warn!("publish {name}: {e}");
                    }
                }
            }
        });
}

/// Play/pause/stop strip shared by every demo.
pub fn transport_panel(ui: &Ui, title: &str, driver: &mut FrameDriver) {
    ui.window(title)
        .size([280.0, 90.0], imgui::Condition::FirstUseEver)
        .position([10.0, 360.0], imgui::Condition::FirstUseEver)
        .build(|| {
            match driver.state() {
                DriverState::Running => {
                    if ui.button("Pause") {
                        driver.pause();
                    }
                }
                DriverState::Idle | DriverState::Paused => {
                    if ui.button("Play") {
                        driver.start();
                    }
                }
                DriverState::Stopped => {
                    ui.text_disabled("stopped");
                }
            }
            ui.same_line();
            if ui.button("Stop") {
                driver.stop();
            }
            ui.text(format!("sim time: {:.2}s", driver.sim_time()));
        });
}
