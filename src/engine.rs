use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::bank::{Counters, Memory, Timers};
use crate::device::{InputDevice, Inputs, Outputs};
use crate::error::{Fault, Result};
use crate::inst::{Inst, Line, PresetTarget, ReadTarget, WriteTarget};
use crate::notify::Notifier;
use crate::parser;
use crate::stack::Stack;

/// Idle delay between two scan passes.
pub const SCAN_INTERVAL: Duration = Duration::from_millis(100);

/// Boolean word memory cells available to a program.
pub const MEMORY_LEN: usize = 1024;
/// Timer cells available to a program.
pub const TIMER_LEN: usize = 264;
/// Counter cells available to a program.
pub const COUNTER_LEN: usize = 264;
/// Input and output devices on a default-sized unit.
pub const DEFAULT_IO_LEN: usize = 64;

/// The scan-cycle engine: owns the program, the operand stack and every
/// storage bank, and drives one background worker that executes the whole
/// program in order, over and over, until stopped or faulted.
///
/// All banks sit behind locks inside one shared state, so caller-thread reads
/// observe consistent cell values while the worker is mid-pass. The worker is
/// the sole writer of memory, timers, counters and outputs while running.
pub struct Engine {
    shared: Arc<Shared>,
}

struct Shared {
    running: AtomicBool,
    /// Bumped on every successful start. A worker that captured an older
    /// generation exits at its next pass boundary, so a stop/start pair can
    /// never leave two workers scanning the same banks.
    generation: AtomicU64,
    program: Mutex<Vec<Line>>,
    parse_error: Mutex<Option<String>>,
    exec_error: Mutex<Option<String>>,
    memory: Mutex<Memory>,
    timers: Mutex<Timers>,
    counters: Mutex<Counters>,
    inputs: Mutex<Inputs>,
    outputs: Mutex<Outputs>,
    /// Fired once per completed scan pass and once on stop.
    cycle: Mutex<Notifier>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(DEFAULT_IO_LEN, DEFAULT_IO_LEN)
    }
}

impl Engine {
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Engine {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                program: Mutex::new(Vec::new()),
                parse_error: Mutex::new(None),
                exec_error: Mutex::new(None),
                memory: Mutex::new(Memory::new(MEMORY_LEN)),
                timers: Mutex::new(Timers::new(TIMER_LEN)),
                counters: Mutex::new(Counters::new(COUNTER_LEN)),
                inputs: Mutex::new(Inputs::new(inputs)),
                outputs: Mutex::new(Outputs::new(outputs)),
                cycle: Mutex::new(Notifier::new()),
            }),
        }
    }

    /// Parse every line and atomically replace the program. Syntax errors do
    /// not fail the call; they are recorded and block [`Engine::start`] until
    /// a corrected program is loaded. Fails only while running.
    pub fn load<I, S>(&self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_running() {
            return Err(Fault::LoadWhileRunning);
        }
        let lines = parser::parse(source);
        let first_error = lines.iter().find_map(|line| {
            line.error_message()
                .map(|msg| format!("line {}: {msg}", line.number))
        });
        *self.shared.parse_error.lock().unwrap() = first_error;
        *self.shared.program.lock().unwrap() = lines;
        Ok(())
    }

    /// Spawn the scan worker. A no-op while already running, while the last
    /// load left a parse error, or while the program has no executable line.
    ///
    /// Memory, timers, outputs and counters are zeroed; operator-set inputs
    /// deliberately persist across runs.
    pub fn start(&self) {
        let shared = &self.shared;
        // Claiming the flag first also keeps a concurrent load() out
        if shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let executable = shared.parse_error.lock().unwrap().is_none()
            && shared
                .program
                .lock()
                .unwrap()
                .iter()
                .any(|line| !line.is_comment());
        if !executable {
            shared.running.store(false, Ordering::Release);
            return;
        }

        *shared.exec_error.lock().unwrap() = None;
        shared.reset();
        let generation = shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, "scan worker starting");

        let shared = Arc::clone(shared);
        thread::spawn(move || shared.scan(generation));
    }

    /// Clear the running flag and reset all storage banks. The worker notices
    /// at its next pass boundary; one in-flight pass always completes.
    /// Idempotent: stopping a stopped engine just repeats the reset.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.reset();
        self.shared.cycle.lock().unwrap().notify();
        info!("engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn has_parse_error(&self) -> bool {
        self.shared.parse_error.lock().unwrap().is_some()
    }

    pub fn parse_error_message(&self) -> Option<String> {
        self.shared.parse_error.lock().unwrap().clone()
    }

    pub fn has_execution_error(&self) -> bool {
        self.shared.exec_error.lock().unwrap().is_some()
    }

    pub fn execution_error_message(&self) -> Option<String> {
        self.shared.exec_error.lock().unwrap().clone()
    }

    /// The loaded program listing, one string per retained line.
    pub fn source(&self) -> Vec<String> {
        self.shared
            .program
            .lock()
            .unwrap()
            .iter()
            .map(|line| line.source.clone())
            .collect()
    }

    pub fn memory_len(&self) -> usize {
        self.shared.memory.lock().unwrap().len()
    }

    pub fn timer_len(&self) -> usize {
        self.shared.timers.lock().unwrap().len()
    }

    pub fn input_len(&self) -> usize {
        self.shared.inputs.lock().unwrap().len()
    }

    pub fn input_value(&self, addr: usize) -> Result<bool> {
        self.shared.inputs.lock().unwrap().get(addr)
    }

    pub fn input_label(&self, addr: usize) -> Result<String> {
        let inputs = self.shared.inputs.lock().unwrap();
        inputs.device(addr).map(|device| device.label().to_string())
    }

    pub fn input_is_modifiable(&self, addr: usize) -> Result<bool> {
        let inputs = self.shared.inputs.lock().unwrap();
        inputs.device(addr).map(InputDevice::is_modifiable)
    }

    /// Flip an operator switch. Allowed at any time, running or not.
    pub fn toggle_input(&self, addr: usize) -> Result<()> {
        self.shared.inputs.lock().unwrap().toggle(addr)
    }

    /// Wire a self-toggling device into an input slot.
    pub fn install_blinker(&self, addr: usize, period: Duration) -> Result<()> {
        self.shared
            .inputs
            .lock()
            .unwrap()
            .install(addr, InputDevice::blinker(format!("Blinker {addr}"), period))
    }

    pub fn output_len(&self) -> usize {
        self.shared.outputs.lock().unwrap().len()
    }

    pub fn output_value(&self, addr: usize) -> Result<bool> {
        self.shared.outputs.lock().unwrap().get(addr)
    }

    pub fn output_label(&self, addr: usize) -> Result<String> {
        let outputs = self.shared.outputs.lock().unwrap();
        outputs.label(addr).map(str::to_string)
    }

    pub fn counter_len(&self) -> usize {
        self.shared.counters.lock().unwrap().len()
    }

    pub fn counter_value(&self, addr: usize) -> Result<i32> {
        self.shared.counters.lock().unwrap().get(addr)
    }

    /// Observe completed scan passes and stops. Callbacks may run on the
    /// worker thread and must never block.
    pub fn subscribe(&self, observer: impl Fn() + Send + 'static) {
        self.shared.cycle.lock().unwrap().subscribe(observer);
    }

    /// Observe input mutations. Callbacks run with the bank lock held: never
    /// block and never call back into the engine.
    pub fn subscribe_inputs(&self, observer: impl Fn() + Send + 'static) {
        self.shared.inputs.lock().unwrap().subscribe(observer);
    }

    /// Observe changed output writes. Same callback rules as inputs.
    pub fn subscribe_outputs(&self, observer: impl Fn() + Send + 'static) {
        self.shared.outputs.lock().unwrap().subscribe(observer);
    }

    /// Observe counter mutations. Same callback rules as inputs.
    pub fn subscribe_counters(&self, observer: impl Fn() + Send + 'static) {
        self.shared.counters.lock().unwrap().subscribe(observer);
    }

    /// Observe memory cell mutations. Same callback rules as inputs.
    pub fn subscribe_memory(&self, observer: impl Fn() + Send + 'static) {
        self.shared.memory.lock().unwrap().subscribe(observer);
    }

    /// Observe timer arming and resets. Same callback rules as inputs.
    pub fn subscribe_timers(&self, observer: impl Fn() + Send + 'static) {
        self.shared.timers.lock().unwrap().subscribe(observer);
    }
}

impl Shared {
    /// Zero every bank the program writes. Inputs are left alone.
    fn reset(&self) {
        self.memory.lock().unwrap().reset();
        self.timers.lock().unwrap().reset();
        self.outputs.lock().unwrap().reset();
        self.counters.lock().unwrap().reset();
    }

    /// True while this worker generation should keep scanning.
    fn active(&self, generation: u64) -> bool {
        self.running.load(Ordering::Acquire)
            && self.generation.load(Ordering::Acquire) == generation
    }

    /// Worker body. Runs until the flag clears, a newer generation takes
    /// over, or a fault propagates out; the returned fault doubles as the
    /// thread's exit value.
    fn scan(&self, generation: u64) -> Result<()> {
        // The program cannot change underneath us: load() refuses while the
        // running flag is set.
        let program = self.program.lock().unwrap().clone();
        let mut stack = Stack::new();

        while self.active(generation) {
            // Residual operands do not leak across cycle boundaries
            stack.clear();
            for line in &program {
                if let Some(inst) = line.inst() {
                    if let Err(fault) = self.execute(inst, &mut stack) {
                        self.fail(generation, line, &fault);
                        return Err(fault);
                    }
                }
            }
            self.cycle.lock().unwrap().notify();

            if self.active(generation) {
                thread::sleep(SCAN_INTERVAL);
            }
        }
        Ok(())
    }

    /// Record a fatal execution fault and halt the cycle. A stale worker
    /// faulting on its last in-flight pass must not stop its successor.
    fn fail(&self, generation: u64, line: &Line, fault: &Fault) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        let message = format!("line {}: {fault}", line.number);
        error!(line = line.number, %fault, "scan worker halting");
        *self.exec_error.lock().unwrap() = Some(message);
        self.running.store(false, Ordering::Release);
        self.cycle.lock().unwrap().notify();
    }

    fn read(&self, subject: ReadTarget, addr: usize) -> Result<bool> {
        match subject {
            ReadTarget::Input => self.inputs.lock().unwrap().get(addr),
            ReadTarget::Output => self.outputs.lock().unwrap().get(addr),
            ReadTarget::Memory => self.memory.lock().unwrap().get(addr),
            ReadTarget::Timer => self.timers.lock().unwrap().get(addr),
        }
    }

    fn write(&self, subject: WriteTarget, addr: usize, value: bool) -> Result<()> {
        match subject {
            WriteTarget::Output => self.outputs.lock().unwrap().set(addr, value),
            WriteTarget::Memory => self.memory.lock().unwrap().set(addr, value),
        }
    }

    fn preset(&self, subject: PresetTarget, addr: usize, value: i32) -> Result<()> {
        match subject {
            PresetTarget::Timer => self.timers.lock().unwrap().set_timer(addr, value),
            PresetTarget::Counter => self.counters.lock().unwrap().set(addr, value),
        }
    }

    fn adjust_counter(&self, addr: usize, delta: i32) -> Result<()> {
        let mut counters = self.counters.lock().unwrap();
        let value = counters.get(addr)?;
        counters.set(addr, value.wrapping_add(delta))
    }

    /// Execute one instruction against the shared stack and banks.
    fn execute(&self, inst: &Inst, stack: &mut Stack) -> Result<()> {
        match *inst {
            Inst::Push { value } => stack.push(value),
            Inst::Get { subject, addr } => stack.push(self.read(subject, addr)?),
            Inst::GetNot { subject, addr } => stack.push(!self.read(subject, addr)?),
            Inst::Dup { count } => {
                for _ in 1..count {
                    let top = stack.top()?;
                    stack.push(top);
                }
            }
            Inst::Not => {
                let operand = stack.pop()?;
                stack.push(!operand);
            }
            Inst::And => {
                let a = stack.pop()?;
                let b = stack.pop()?;
                stack.push(a && b);
            }
            Inst::Or => {
                let a = stack.pop()?;
                let b = stack.pop()?;
                stack.push(a || b);
            }
            Inst::Xor => {
                let a = stack.pop()?;
                let b = stack.pop()?;
                stack.push(a ^ b);
            }
            Inst::Mov { subject, addr } => {
                let value = stack.pop()?;
                self.write(subject, addr, value)?;
            }
            Inst::CMov { subject, addr, value } => {
                if stack.pop()? {
                    self.write(subject, addr, value)?;
                }
            }
            Inst::Set { subject, addr, value } => self.preset(subject, addr, value)?,
            Inst::CSet { subject, addr, value } => {
                if stack.pop()? {
                    self.preset(subject, addr, value)?;
                }
            }
            Inst::Inc { addr } => {
                if stack.pop()? {
                    self.adjust_counter(addr, 1)?;
                }
            }
            Inst::Dec { addr } => {
                if stack.pop()? {
                    self.adjust_counter(addr, -1)?;
                }
            }
            Inst::Cmp { addr, value } => {
                let counter = self.counters.lock().unwrap().get(addr)?;
                stack.push(counter == value);
            }
            Inst::Gt { addr, value } => {
                let counter = self.counters.lock().unwrap().get(addr)?;
                stack.push(counter > value);
            }
            Inst::Le { addr, value } => {
                let counter = self.counters.lock().unwrap().get(addr)?;
                stack.push(counter < value);
            }
        }
        Ok(())
    }
}
