//! Direct `reis` (libei) backend.
//!
//! Uses the `reis` crate to speak the libei protocol directly, connecting
//! either to `LIBEI_SOCKET` or through the `RemoteDesktop` XDG portal
//! (`ashpd`).

use std::collections::HashMap;
use std::os::unix::net::UnixStream;
use std::time::SystemTime;

use reis::ei;
use reis::handshake::ei_handshake_blocking;
use reis::PendingRequestResult;

use crate::backend::{HidBackend, MouseButton};
use crate::error::HidError;
use crate::geometry::{Bounds, Point};
use crate::keymap::Key;

/// Linux input event codes for mouse buttons.
const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;
const BTN_FORWARD: u32 = 0x115;
const BTN_BACK: u32 = 0x116;

/// Maximum poll rounds while waiting for the EIS server to offer a device.
const DISCOVERY_ROUNDS: usize = 200;
/// Poll timeout per discovery round, in milliseconds.
const DISCOVERY_POLL_MS: i32 = 50;

/// Convert a button to its Linux evdev code.
const fn button_code(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => BTN_LEFT,
        MouseButton::Right => BTN_RIGHT,
        MouseButton::Middle => BTN_MIDDLE,
        MouseButton::Back => BTN_BACK,
        MouseButton::Forward => BTN_FORWARD,
    }
}

/// Shadow pointer location.
///
/// libei is a send-only protocol with no cursor query, so the backend
/// remembers where it last put the pointer. Starts at the centre of the
/// device regions (or the origin when none were announced).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerShadow {
    position: Point,
}

impl PointerShadow {
    #[must_use]
    pub fn new(bounds: Option<Bounds>) -> Self {
        Self {
            position: bounds.map_or_else(Point::default, |b| b.center()),
        }
    }

    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Record a move to `to`, returning the delta from the previous location.
    pub fn move_to(&mut self, to: Point) -> (f64, f64) {
        let delta = (to.x - self.position.x, to.y - self.position.y);
        self.position = to;
        delta
    }
}

/// Data collected during device enumeration.
#[derive(Default)]
struct DeviceData {
    interfaces: HashMap<String, reis::Object>,
    regions: Vec<Bounds>,
}

impl DeviceData {
    fn interface<T: reis::Interface>(&self) -> Option<T> {
        self.interfaces.get(T::NAME)?.clone().downcast()
    }

    fn bounds(&self) -> Option<Bounds> {
        let merged = self
            .regions
            .iter()
            .fold(Bounds::default(), |acc, region| acc.union(*region));
        (!merged.is_empty()).then_some(merged)
    }
}

/// Event synthesis backed by `reis` (direct libei protocol).
pub struct EiBackend {
    context: ei::Context,
    device: ei::Device,
    keyboard: Option<ei::Keyboard>,
    pointer: Option<ei::Pointer>,
    pointer_abs: Option<ei::PointerAbsolute>,
    button: Option<ei::Button>,
    serial: u32,
    sequence: u32,
    emulating: bool,
    bounds: Option<Bounds>,
    shadow: PointerShadow,
}

impl EiBackend {
    /// Connect to an EIS server and wait for a usable device.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::Init`] if no EIS socket can be obtained, the
    /// handshake fails, or no input device is offered.
    pub async fn new(app_name: &str) -> Result<Self, HidError> {
        let (context, serial) = setup_ei_context(app_name).await?;
        tokio::task::spawn_blocking(move || discover_devices(context, serial))
            .await
            .map_err(init_error("discovery task panicked"))?
    }

    /// Get the current timestamp in microseconds for frame events.
    #[allow(clippy::cast_possible_truncation)]
    fn timestamp_us() -> u64 {
        SystemTime::UNIX_EPOCH
            .elapsed()
            .map_or(0, |d| d.as_micros() as u64)
    }

    /// Ensure we are in emulating mode before sending events.
    fn ensure_emulating(&mut self) {
        if !self.emulating {
            self.device.start_emulating(self.serial, self.sequence);
            self.sequence += 1;
            self.emulating = true;
        }
    }

    /// Send a frame event and flush the context.
    fn frame_and_flush(&self) -> Result<(), HidError> {
        self.device.frame(self.serial, Self::timestamp_us());
        self.context
            .flush()
            .map_err(|e| HidError::Os(format!("ei flush: {e}")))
    }
}

impl HidBackend for EiBackend {
    fn name(&self) -> &'static str {
        "libei"
    }

    fn screen_bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn cursor_position(&mut self) -> Result<Point, HidError> {
        Ok(self.shadow.position())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn warp_pointer(&mut self, to: Point) -> Result<(), HidError> {
        if self.pointer_abs.is_none() && self.pointer.is_none() {
            return Err(HidError::Unsupported("pointer motion"));
        }
        self.ensure_emulating();
        if let Some(ref pointer_abs) = self.pointer_abs {
            pointer_abs.motion_absolute(to.x as f32, to.y as f32);
            self.shadow.move_to(to);
        } else if let Some(ref pointer) = self.pointer {
            let (dx, dy) = self.shadow.move_to(to);
            pointer.motion_relative(dx as f32, dy as f32);
        }
        self.frame_and_flush()
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), HidError> {
        if self.button.is_none() {
            return Err(HidError::Unsupported("mouse buttons"));
        }
        let state = if pressed {
            ei::button::ButtonState::Press
        } else {
            ei::button::ButtonState::Released
        };
        self.ensure_emulating();
        if let Some(ref device_button) = self.button {
            device_button.button(button_code(button), state);
        }
        self.frame_and_flush()
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), HidError> {
        if self.keyboard.is_none() {
            return Err(HidError::Unsupported("keyboard"));
        }
        let code = key.to_evdev().ok_or(HidError::UnmappedKey(key))?;
        let state = if pressed {
            ei::keyboard::KeyState::Press
        } else {
            ei::keyboard::KeyState::Released
        };
        self.ensure_emulating();
        if let Some(ref keyboard) = self.keyboard {
            keyboard.key(code, state);
        }
        self.frame_and_flush()
    }

    fn show_cursor(&mut self) -> Result<(), HidError> {
        Err(HidError::Unsupported("cursor visibility"))
    }
}

impl Drop for EiBackend {
    fn drop(&mut self) {
        if self.emulating {
            self.device.stop_emulating(self.serial);
            let _ = self.context.flush();
        }
    }
}

/// Map a failed setup step to [`HidError::Init`], prefixed with the step.
fn init_error<E: std::fmt::Display>(step: &'static str) -> impl FnOnce(E) -> HidError {
    move |e| HidError::Init(format!("{step}: {e}"))
}

/// Perform the sender handshake on a blocking thread.
async fn handshake(context: ei::Context, app_name: &str) -> Result<(ei::Context, u32), HidError> {
    let app_name = app_name.to_string();
    let (context, resp) = tokio::task::spawn_blocking(move || {
        ei_handshake_blocking(&context, &app_name, ei::handshake::ContextType::Sender)
            .map(|resp| (context, resp))
    })
    .await
    .map_err(init_error("handshake task panicked"))?
    .map_err(init_error("handshake failed"))?;

    Ok((context, resp.serial))
}

/// Ask the `RemoteDesktop` portal for keyboard and pointer access and
/// return the EIS socket it hands out.
async fn portal_eis_socket() -> Result<UnixStream, HidError> {
    use ashpd::desktop::remote_desktop::{DeviceType, RemoteDesktop};
    use ashpd::desktop::PersistMode;

    let portal = RemoteDesktop::new()
        .await
        .map_err(init_error("RemoteDesktop proxy"))?;
    let session = portal
        .create_session()
        .await
        .map_err(init_error("create session"))?;

    portal
        .select_devices(
            &session,
            DeviceType::Keyboard | DeviceType::Pointer,
            None,
            PersistMode::DoNot,
        )
        .await
        .map_err(init_error("select devices"))?;
    portal
        .start(&session, None)
        .await
        .map_err(init_error("start session"))?
        .response()
        .map_err(init_error("start response"))?;

    let fd = portal
        .connect_to_eis(&session)
        .await
        .map_err(init_error("connect to EIS"))?;
    Ok(UnixStream::from(fd))
}

/// Obtain an EIS connection and perform the libei handshake.
///
/// `LIBEI_SOCKET` wins when set; otherwise the portal is asked.
async fn setup_ei_context(app_name: &str) -> Result<(ei::Context, u32), HidError> {
    if let Ok(Some(context)) = ei::Context::connect_to_env() {
        tracing::info!("Connected to ei via LIBEI_SOCKET");
        return handshake(context, app_name).await;
    }

    tracing::info!("No LIBEI_SOCKET, using RemoteDesktop portal");
    let stream = portal_eis_socket().await?;
    let context = ei::Context::new(stream).map_err(init_error("ei context"))?;
    tracing::info!("Connected to ei via RemoteDesktop portal");
    handshake(context, app_name).await
}

/// What the EIS server has told us so far: seat capabilities, the first
/// device offered and whether that device has been resumed.
#[derive(Default)]
struct Discovery {
    seats: HashMap<ei::Seat, HashMap<String, u64>>,
    device: Option<(ei::Device, DeviceData)>,
    resumed_serial: Option<u32>,
}

impl Discovery {
    fn is_complete(&self) -> bool {
        self.device.is_some() && self.resumed_serial.is_some()
    }

    fn handle(&mut self, context: &ei::Context, event: ei::Event) -> Result<(), HidError> {
        match event {
            ei::Event::Connection(_connection, event) => return self.on_connection(event),
            ei::Event::Seat(seat, event) => self.on_seat(context, &seat, event),
            ei::Event::Device(device, event) => self.on_device(&device, event),
            _ => {}
        }
        Ok(())
    }

    fn on_connection(&mut self, event: ei::connection::Event) -> Result<(), HidError> {
        match event {
            ei::connection::Event::Seat { seat } => {
                self.seats.insert(seat, HashMap::new());
            }
            ei::connection::Event::Ping { ping } => {
                ping.done(0);
            }
            ei::connection::Event::Disconnected { .. } => {
                return Err(HidError::Init("disconnected during discovery".to_string()));
            }
            _ => {}
        }
        Ok(())
    }

    /// Bind everything a seat offers once it has listed its capabilities.
    fn on_seat(&mut self, context: &ei::Context, seat: &ei::Seat, event: ei::seat::Event) {
        match event {
            ei::seat::Event::Capability { mask, interface } => {
                if let Some(caps) = self.seats.get_mut(seat) {
                    caps.insert(interface, mask);
                }
            }
            ei::seat::Event::Done => {
                if let Some(caps) = self.seats.get(seat) {
                    seat.bind(caps.values().fold(0, |acc, mask| acc | mask));
                    let _ = context.flush();
                }
            }
            ei::seat::Event::Device { device } if self.device.is_none() => {
                self.device = Some((device, DeviceData::default()));
            }
            _ => {}
        }
    }

    /// Record interfaces and regions of the chosen device. Events for any
    /// other device are ignored.
    fn on_device(&mut self, device: &ei::Device, event: ei::device::Event) {
        let Some((chosen, data)) = self.device.as_mut() else {
            return;
        };
        if *chosen != *device {
            return;
        }
        match event {
            ei::device::Event::Interface { object } => {
                data.interfaces
                    .insert(object.interface().to_string(), object);
            }
            ei::device::Event::Region {
                offset_x,
                offset_y,
                width,
                hight,
                ..
            } => data.regions.push(Bounds::new(
                f64::from(offset_x),
                f64::from(offset_y),
                f64::from(width),
                f64::from(hight),
            )),
            ei::device::Event::Resumed { serial } => self.resumed_serial = Some(serial),
            _ => {}
        }
    }

    fn into_backend(self, context: ei::Context, serial: u32) -> Result<EiBackend, HidError> {
        let (device, data) = self
            .device
            .ok_or_else(|| HidError::Init("no input device found".to_string()))?;

        let keyboard = data.interface::<ei::Keyboard>();
        let pointer = data.interface::<ei::Pointer>();
        let pointer_abs = data.interface::<ei::PointerAbsolute>();
        let button = data.interface::<ei::Button>();
        let bounds = data.bounds();

        tracing::info!(
            keyboard = keyboard.is_some(),
            pointer = pointer.is_some(),
            pointer_abs = pointer_abs.is_some(),
            button = button.is_some(),
            regions = data.regions.len(),
            ?bounds,
            "ei device capabilities"
        );

        Ok(EiBackend {
            context,
            device,
            keyboard,
            pointer,
            pointer_abs,
            button,
            serial: self.resumed_serial.unwrap_or(serial),
            sequence: 0,
            emulating: false,
            bounds,
            shadow: PointerShadow::new(bounds),
        })
    }
}

/// Pump events after the handshake until a device is resumed or the
/// rounds run out.
fn discover_devices(context: ei::Context, serial: u32) -> Result<EiBackend, HidError> {
    let mut discovery = Discovery::default();

    // The handshake may have buffered seat data already, so pending events
    // are drained on every round, timeout or not.
    for round in 0..DISCOVERY_ROUNDS {
        let ready = rustix::event::poll(
            &mut [rustix::event::PollFd::new(
                &context,
                rustix::event::PollFlags::IN,
            )],
            DISCOVERY_POLL_MS,
        )
        .map_err(init_error("poll"))?;
        if ready > 0 {
            context.read().map_err(init_error("read"))?;
        }

        while let Some(result) = context.pending_event() {
            match result {
                PendingRequestResult::Request(event) => discovery.handle(&context, event)?,
                PendingRequestResult::ParseError(e) => {
                    tracing::warn!("Parse error during device discovery: {e:?}");
                }
                PendingRequestResult::InvalidObject(id) => {
                    tracing::warn!(id, "Invalid object during device discovery");
                }
            }
        }
        let _ = context.flush();

        if discovery.is_complete() {
            tracing::debug!(round, "Device discovery complete");
            break;
        }
    }

    discovery.into_backend(context, serial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_starts_at_region_center() {
        let shadow = PointerShadow::new(Some(Bounds::new(0.0, 0.0, 1920.0, 1080.0)));
        assert_eq!(shadow.position(), Point::new(960.0, 540.0));
    }

    #[test]
    fn shadow_starts_at_origin_without_regions() {
        assert_eq!(PointerShadow::new(None).position(), Point::default());
    }

    #[test]
    fn shadow_reports_delta() {
        let mut shadow = PointerShadow::new(None);
        assert_eq!(shadow.move_to(Point::new(10.0, 20.0)), (10.0, 20.0));
        assert_eq!(shadow.move_to(Point::new(4.0, 25.0)), (-6.0, 5.0));
        assert_eq!(shadow.position(), Point::new(4.0, 25.0));
    }

    #[test]
    fn device_regions_merge() {
        let data = DeviceData {
            interfaces: HashMap::new(),
            regions: vec![
                Bounds::new(0.0, 0.0, 1920.0, 1080.0),
                Bounds::new(1920.0, 0.0, 1280.0, 1024.0),
            ],
        };
        assert_eq!(data.bounds(), Some(Bounds::new(0.0, 0.0, 3200.0, 1080.0)));
        assert_eq!(DeviceData::default().bounds(), None);
    }

    #[test]
    fn discovery_needs_a_resumed_device() {
        let mut discovery = Discovery::default();
        assert!(!discovery.is_complete());
        discovery.resumed_serial = Some(7);
        assert!(!discovery.is_complete());
    }

    #[test]
    fn init_errors_name_the_step() {
        let err = init_error("select devices")("portal closed");
        assert!(matches!(err, HidError::Init(msg) if msg == "select devices: portal closed"));
    }

    #[test]
    fn button_codes() {
        assert_eq!(button_code(MouseButton::Left), 0x110);
        assert_eq!(button_code(MouseButton::Back), 0x116);
        assert_eq!(button_code(MouseButton::Forward), 0x115);
    }
}
