//! Cooperative round-robin execution of device tasks.
//!
//! Tasks run one per pass, in a fixed order, each to completion. Tasks are
//! started and stopped by USB lifecycle events, except for the LED refresh
//! which keeps running regardless of the host.

use crate::device::{DeviceState, Platform};
use crate::log;
use crate::midi::{MidiTransport, UsbStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    UsbManagement,
    Midi,
    Buttons,
    Leds,
}

const TASKS: usize = 4;

impl Task {
    /// All tasks in the order they are executed.
    pub const ALL: [Task; TASKS] = [Task::UsbManagement, Task::Midi, Task::Buttons, Task::Leds];
}

/// Changes of the USB connection, as reported by the USB stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Connected,
    Configured,
    Disconnected,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scheduler {
    enabled: [bool; TASKS],
    cursor: usize,
    status: UsbStatus,
}

impl Scheduler {
    /// Start with only LEDs running, waiting for the host.
    pub fn start<T: MidiTransport>(transport: &mut T) -> Self {
        let mut scheduler = Self {
            enabled: [false; TASKS],
            cursor: 0,
            status: UsbStatus::NotReady,
        };
        scheduler.set_enabled(Task::Leds, true);
        transport.set_status(scheduler.status);
        scheduler
    }

    pub fn set_enabled(&mut self, task: Task, enabled: bool) {
        self.enabled[task as usize] = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self, task: Task) -> bool {
        self.enabled[task as usize]
    }

    #[must_use]
    pub fn status(&self) -> UsbStatus {
        self.status
    }

    pub fn handle<T: MidiTransport>(&mut self, event: Event, transport: &mut T) {
        log::info!("USB event: {}", event);
        match event {
            Event::Connected => {
                self.set_enabled(Task::UsbManagement, true);
                self.status = UsbStatus::Enumerating;
            }
            Event::Configured => {
                self.set_enabled(Task::Midi, true);
                self.set_enabled(Task::Buttons, true);
                self.status = UsbStatus::Ready;
            }
            Event::Disconnected => {
                self.set_enabled(Task::Midi, false);
                self.set_enabled(Task::UsbManagement, false);
                self.set_enabled(Task::Buttons, false);
                self.status = UsbStatus::NotReady;
            }
        }
        transport.set_status(self.status);
    }

    /// Pick the next enabled task after the previously executed one.
    pub fn next_task(&mut self) -> Option<Task> {
        let offset = (0..TASKS).find(|offset| self.enabled[(self.cursor + offset) % TASKS])?;
        let index = (self.cursor + offset) % TASKS;
        self.cursor = (index + 1) % TASKS;
        Some(Task::ALL[index])
    }

    /// Execute a single task. Returns the task that ran, if any was enabled.
    pub fn run_pass<P: Platform>(
        &mut self,
        device: &mut DeviceState,
        platform: &mut P,
    ) -> Option<Task> {
        let task = self.next_task()?;
        match task {
            Task::UsbManagement => device.usb_task(platform),
            Task::Midi => device.midi_task(platform),
            Task::Buttons => device.buttons_task(platform),
            Task::Leds => device.leds_task(platform),
        }
        Some(task)
    }

    /// Run passes forever.
    pub fn run<P: Platform>(&mut self, device: &mut DeviceState, platform: &mut P) -> ! {
        loop {
            self.run_pass(device, platform);
        }
    }
}
