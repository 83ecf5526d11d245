//! Simulated backend for tests and desktop runs
//!
//! Every device handle shares one state table with the backend, so tests
//! can script sensor readings, inject faults and inspect what was
//! commanded. Addresses stay claimed until the handle that opened them is
//! dropped. Motors follow a first-order model: velocity is output times
//! free speed, position integrates velocity on [`SimBackend::step`].

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::traits::*;
use super::types::*;
use crate::nt::{LocalNetworkTables, NetworkTablesBackend};

/// CTRE magnetic encoder ticks per rotation
pub const PHOENIX_TICKS_PER_REV: f64 = 4096.0;

/// Free speed of a simulated motor at full output, rotations per second
pub const DEFAULT_FREE_SPEED_RPS: f64 = 94.6;

/// Which vendor API opened a simulated motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMotorKind {
    Phoenix(PhoenixModel),
    SparkMax(SparkMotorKind),
}

/// Snapshot of a simulated motor
#[derive(Debug, Clone, PartialEq)]
pub struct SimMotor {
    pub kind: SimMotorKind,
    /// Last commanded output, before inversion
    pub output: f64,
    pub inverted: bool,
    /// Phoenix neutral mode, if ever set
    pub neutral_mode: Option<NeutralMode>,
    /// REV idle mode, if ever set
    pub idle_mode: Option<IdleMode>,
    /// Shaft position in rotations
    pub position: f64,
    /// Shaft velocity in rotations per second
    pub velocity: f64,
    /// Number of output commands received
    pub writes: u64,
}

impl SimMotor {
    fn new(kind: SimMotorKind) -> Self {
        Self {
            kind,
            output: 0.0,
            inverted: false,
            neutral_mode: None,
            idle_mode: None,
            position: 0.0,
            velocity: 0.0,
            writes: 0,
        }
    }

    /// Output as seen at the motor terminals
    pub fn applied_output(&self) -> f64 {
        if self.inverted {
            -self.output
        } else {
            self.output
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimGyro {
    pub angle: f64,
    pub rate: f64,
    pub calibrations: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimCompressor {
    pub enabled: bool,
    pub pressure: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimEncoder {
    pub count: i64,
    /// Counts per second
    pub rate: f64,
    pub distance_per_pulse: f64,
    pub reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimAnalog {
    pub voltage: f64,
    pub average_bits: u32,
    pub oversample_bits: u32,
}

#[derive(Debug, Default)]
struct SimState {
    claimed: HashSet<DeviceAddress>,
    fail_open: HashSet<DeviceAddress>,
    fail_writes: HashSet<DeviceAddress>,
    opened: usize,
    motors: HashMap<u8, SimMotor>,
    digital: HashMap<u8, bool>,
    gyros: HashMap<DeviceAddress, SimGyro>,
    solenoids: HashMap<(u8, u8), bool>,
    compressors: HashMap<u8, SimCompressor>,
    servos: HashMap<u8, f64>,
    encoders: HashMap<u8, SimEncoder>,
    analog: HashMap<u8, SimAnalog>,
}

impl SimState {
    fn claim(&mut self, addrs: &[DeviceAddress]) -> DeviceResult<()> {
        for addr in addrs {
            if self.fail_open.contains(addr) {
                return Err(DeviceError::new(format!("no device responding at {}", addr)));
            }
            if self.claimed.contains(addr) {
                return Err(DeviceError::new(format!("{} already allocated", addr)));
            }
        }
        self.claimed.extend(addrs.iter().copied());
        self.opened += 1;
        Ok(())
    }

    fn check_write(&self, addr: DeviceAddress) -> DeviceResult<()> {
        if self.fail_writes.contains(&addr) {
            return Err(DeviceError::new(format!("{} did not acknowledge", addr)));
        }
        Ok(())
    }
}

type Shared = Arc<Mutex<SimState>>;

/// Addresses held by one open handle, released when the handle drops
struct Claim {
    state: Shared,
    addrs: Vec<DeviceAddress>,
}

impl Claim {
    fn take(shared: &Shared, state: &mut SimState, addrs: &[DeviceAddress]) -> DeviceResult<Self> {
        state.claim(addrs)?;
        Ok(Self {
            state: shared.clone(),
            addrs: addrs.to_vec(),
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        for addr in &self.addrs {
            state.claimed.remove(addr);
        }
    }
}

/// In-process implementation of [`Backend`]
#[derive(Clone)]
pub struct SimBackend {
    state: Shared,
    nt: Arc<LocalNetworkTables>,
    free_speed_rps: f64,
}

impl std::fmt::Debug for SimBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBackend")
            .field("opened", &self.opened_count())
            .finish()
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
            nt: Arc::new(LocalNetworkTables::new()),
            free_speed_rps: DEFAULT_FREE_SPEED_RPS,
        }
    }

    /// Set the motor free speed used by [`step`](Self::step)
    pub fn with_free_speed(mut self, rps: f64) -> Self {
        self.free_speed_rps = rps;
        self
    }

    /// Make the next open of `addr` fail as if nothing answered
    pub fn fail_open(&self, addr: DeviceAddress) {
        self.state.lock().fail_open.insert(addr);
    }

    /// Make every write to `addr` fail
    pub fn fail_writes(&self, addr: DeviceAddress) {
        self.state.lock().fail_writes.insert(addr);
    }

    /// Clear injected faults
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.fail_open.clear();
        state.fail_writes.clear();
    }

    /// Number of devices opened so far
    pub fn opened_count(&self) -> usize {
        self.state.lock().opened
    }

    pub fn is_claimed(&self, addr: DeviceAddress) -> bool {
        self.state.lock().claimed.contains(&addr)
    }

    pub fn motor(&self, can_id: u8) -> Option<SimMotor> {
        self.state.lock().motors.get(&can_id).cloned()
    }

    pub fn set_motor_position(&self, can_id: u8, rotations: f64) {
        if let Some(m) = self.state.lock().motors.get_mut(&can_id) {
            m.position = rotations;
        }
    }

    pub fn set_digital_input(&self, channel: u8, value: bool) {
        self.state.lock().digital.insert(channel, value);
    }

    pub fn gyro(&self, gyro_type: GyroType, port: u8) -> Option<SimGyro> {
        self.state.lock().gyros.get(&gyro_address(gyro_type, port)).cloned()
    }

    pub fn set_gyro_reading(&self, gyro_type: GyroType, port: u8, angle: f64, rate: f64) {
        let mut state = self.state.lock();
        let gyro = state.gyros.entry(gyro_address(gyro_type, port)).or_default();
        gyro.angle = angle;
        gyro.rate = rate;
    }

    pub fn solenoid(&self, module_id: u8, channel: u8) -> Option<bool> {
        self.state.lock().solenoids.get(&(module_id, channel)).copied()
    }

    pub fn compressor(&self, module_id: u8) -> Option<SimCompressor> {
        self.state.lock().compressors.get(&module_id).cloned()
    }

    pub fn set_pressure(&self, module_id: u8, psi: f64) {
        self.state
            .lock()
            .compressors
            .entry(module_id)
            .or_default()
            .pressure = psi;
    }

    /// Servo position in [0, 1]
    pub fn servo(&self, channel: u8) -> Option<f64> {
        self.state.lock().servos.get(&channel).copied()
    }

    pub fn encoder(&self, channel_a: u8) -> Option<SimEncoder> {
        self.state.lock().encoders.get(&channel_a).cloned()
    }

    pub fn set_encoder_count(&self, channel_a: u8, count: i64, rate: f64) {
        let mut state = self.state.lock();
        let enc = state.encoders.entry(channel_a).or_default();
        enc.count = count;
        enc.rate = rate;
    }

    pub fn analog(&self, channel: u8) -> Option<SimAnalog> {
        self.state.lock().analog.get(&channel).cloned()
    }

    pub fn set_analog_voltage(&self, channel: u8, volts: f64) {
        self.state.lock().analog.entry(channel).or_default().voltage = volts;
    }

    /// The in-process NetworkTables instance
    pub fn tables(&self) -> Arc<LocalNetworkTables> {
        self.nt.clone()
    }

    /// Advance motor physics by `dt` seconds
    pub fn step(&self, dt: f64) {
        let free_speed = self.free_speed_rps;
        for motor in self.state.lock().motors.values_mut() {
            motor.velocity = motor.applied_output() * free_speed;
            motor.position += motor.velocity * dt;
        }
    }
}

fn gyro_address(gyro_type: GyroType, port: u8) -> DeviceAddress {
    match gyro_type {
        GyroType::Analog => DeviceAddress::Analog(port),
        GyroType::NavX => DeviceAddress::Mxp,
    }
}

impl Backend for SimBackend {
    fn name(&self) -> &str {
        "sim"
    }

    fn open_phoenix(&self, model: PhoenixModel, can_id: u8) -> DeviceResult<Box<dyn PhoenixMotor>> {
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[DeviceAddress::Can(can_id)])?;
        state
            .motors
            .insert(can_id, SimMotor::new(SimMotorKind::Phoenix(model)));
        Ok(Box::new(SimPhoenix {
            _claim: claim,
            state: self.state.clone(),
            can_id,
            model,
        }))
    }

    fn open_spark_max(&self, can_id: u8, kind: SparkMotorKind) -> DeviceResult<Box<dyn RevMotor>> {
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[DeviceAddress::Can(can_id)])?;
        state
            .motors
            .insert(can_id, SimMotor::new(SimMotorKind::SparkMax(kind)));
        Ok(Box::new(SimSparkMax {
            _claim: claim,
            state: self.state.clone(),
            can_id,
        }))
    }

    fn open_digital_input(&self, channel: u8) -> DeviceResult<Box<dyn DigitalInputDevice>> {
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[DeviceAddress::Dio(channel)])?;
        state.digital.entry(channel).or_insert(false);
        Ok(Box::new(SimDigitalInput {
            _claim: claim,
            state: self.state.clone(),
            channel,
        }))
    }

    fn open_gyro(&self, gyro_type: GyroType, port: u8) -> DeviceResult<Box<dyn GyroDevice>> {
        let addr = gyro_address(gyro_type, port);
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[addr])?;
        state.gyros.entry(addr).or_default();
        Ok(Box::new(SimGyroDevice {
            _claim: claim,
            state: self.state.clone(),
            addr,
        }))
    }

    fn open_solenoid(
        &self,
        _module: ModuleType,
        module_id: u8,
        channel: u8,
    ) -> DeviceResult<Box<dyn SolenoidDevice>> {
        let addr = DeviceAddress::Pneumatics {
            module_id,
            channel: Some(channel),
        };
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[addr])?;
        state.solenoids.insert((module_id, channel), false);
        Ok(Box::new(SimSolenoid {
            _claim: claim,
            state: self.state.clone(),
            module_id,
            channel,
        }))
    }

    fn open_compressor(
        &self,
        module: ModuleType,
        module_id: u8,
    ) -> DeviceResult<Box<dyn CompressorDevice>> {
        let mut state = self.state.lock();
        let addr = DeviceAddress::Pneumatics {
            module_id,
            channel: None,
        };
        let claim = Claim::take(&self.state, &mut state, &[addr])?;
        state.compressors.entry(module_id).or_default();
        Ok(Box::new(SimCompressorDevice {
            _claim: claim,
            state: self.state.clone(),
            module,
            module_id,
        }))
    }

    fn open_servo(&self, channel: u8) -> DeviceResult<Box<dyn ServoDevice>> {
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[DeviceAddress::Pwm(channel)])?;
        state.servos.insert(channel, 0.0);
        Ok(Box::new(SimServo {
            _claim: claim,
            state: self.state.clone(),
            channel,
        }))
    }

    fn open_quadrature_encoder(
        &self,
        channel_a: u8,
        channel_b: u8,
        _encoding: EncodingType,
        reversed: bool,
    ) -> DeviceResult<Box<dyn EncoderDevice>> {
        let mut state = self.state.lock();
        let addrs = [DeviceAddress::Dio(channel_a), DeviceAddress::Dio(channel_b)];
        let claim = Claim::take(&self.state, &mut state, &addrs)?;
        let enc = state.encoders.entry(channel_a).or_default();
        enc.reversed = reversed;
        enc.distance_per_pulse = 1.0;
        Ok(Box::new(SimEncoderDevice {
            _claim: claim,
            state: self.state.clone(),
            channel_a,
        }))
    }

    fn open_analog_input(&self, channel: u8) -> DeviceResult<Box<dyn AnalogInputDevice>> {
        let mut state = self.state.lock();
        let claim = Claim::take(&self.state, &mut state, &[DeviceAddress::Analog(channel)])?;
        state.analog.entry(channel).or_default();
        Ok(Box::new(SimAnalogInput {
            _claim: claim,
            state: self.state.clone(),
            channel,
        }))
    }

    fn network_tables(&self) -> DeviceResult<Arc<dyn NetworkTablesBackend>> {
        let state = self.state.lock();
        if state.fail_open.contains(&DeviceAddress::NetworkTables) {
            return Err(DeviceError::new("NetworkTables server unavailable"));
        }
        Ok(self.nt.clone())
    }
}

fn with_motor<T>(state: &Shared, can_id: u8, f: impl FnOnce(&mut SimMotor) -> T) -> DeviceResult<T> {
    let mut state = state.lock();
    state.check_write(DeviceAddress::Can(can_id))?;
    state
        .motors
        .get_mut(&can_id)
        .map(f)
        .ok_or_else(|| DeviceError::new(format!("CAN {} not present", can_id)))
}

fn read_motor<T>(state: &Shared, can_id: u8, f: impl FnOnce(&SimMotor) -> T) -> DeviceResult<T> {
    state
        .lock()
        .motors
        .get(&can_id)
        .map(f)
        .ok_or_else(|| DeviceError::new(format!("CAN {} not present", can_id)))
}

struct SimPhoenix {
    _claim: Claim,
    state: Shared,
    can_id: u8,
    model: PhoenixModel,
}

impl SimPhoenix {
    fn sensor(&self) -> DeviceResult<()> {
        if self.model.has_sensor() {
            Ok(())
        } else {
            Err(DeviceError::new(format!("{} has no sensor port", self.model)))
        }
    }
}

impl PhoenixMotor for SimPhoenix {
    fn set_percent_output(&mut self, output: f64) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| {
            m.output = output;
            m.writes += 1;
        })
    }

    fn motor_output_percent(&self) -> f64 {
        read_motor(&self.state, self.can_id, |m| m.output).unwrap_or(0.0)
    }

    fn set_inverted(&mut self, inverted: bool) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| m.inverted = inverted)
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| m.neutral_mode = Some(mode))
    }

    fn selected_sensor_position(&self) -> DeviceResult<f64> {
        self.sensor()?;
        read_motor(&self.state, self.can_id, |m| m.position * PHOENIX_TICKS_PER_REV)
    }

    fn selected_sensor_velocity(&self) -> DeviceResult<f64> {
        self.sensor()?;
        read_motor(&self.state, self.can_id, |m| {
            m.velocity * PHOENIX_TICKS_PER_REV / 10.0
        })
    }

    fn set_selected_sensor_position(&mut self, ticks: f64) -> DeviceResult<()> {
        self.sensor()?;
        with_motor(&self.state, self.can_id, |m| {
            m.position = ticks / PHOENIX_TICKS_PER_REV
        })
    }
}

struct SimSparkMax {
    _claim: Claim,
    state: Shared,
    can_id: u8,
}

impl RevMotor for SimSparkMax {
    fn set(&mut self, speed: f64) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| {
            m.output = speed;
            m.writes += 1;
        })
    }

    fn get(&self) -> f64 {
        read_motor(&self.state, self.can_id, |m| m.output).unwrap_or(0.0)
    }

    fn set_inverted(&mut self, inverted: bool) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| m.inverted = inverted)
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| m.idle_mode = Some(mode))
    }

    fn encoder_position(&self) -> DeviceResult<f64> {
        read_motor(&self.state, self.can_id, |m| m.position)
    }

    fn encoder_velocity(&self) -> DeviceResult<f64> {
        read_motor(&self.state, self.can_id, |m| m.velocity * 60.0)
    }

    fn set_encoder_position(&mut self, rotations: f64) -> DeviceResult<()> {
        with_motor(&self.state, self.can_id, |m| m.position = rotations)
    }
}

struct SimDigitalInput {
    _claim: Claim,
    state: Shared,
    channel: u8,
}

impl DigitalInputDevice for SimDigitalInput {
    fn get(&self) -> DeviceResult<bool> {
        Ok(self
            .state
            .lock()
            .digital
            .get(&self.channel)
            .copied()
            .unwrap_or(false))
    }
}

struct SimGyroDevice {
    _claim: Claim,
    state: Shared,
    addr: DeviceAddress,
}

impl SimGyroDevice {
    fn with<T>(&self, f: impl FnOnce(&mut SimGyro) -> T) -> DeviceResult<T> {
        let mut state = self.state.lock();
        state
            .gyros
            .get_mut(&self.addr)
            .map(f)
            .ok_or_else(|| DeviceError::new(format!("no gyro at {}", self.addr)))
    }
}

impl GyroDevice for SimGyroDevice {
    fn angle(&self) -> DeviceResult<f64> {
        self.with(|g| g.angle)
    }

    fn rate(&self) -> DeviceResult<f64> {
        self.with(|g| g.rate)
    }

    fn reset(&mut self) -> DeviceResult<()> {
        self.with(|g| g.angle = 0.0)
    }

    fn calibrate(&mut self) -> DeviceResult<()> {
        self.with(|g| {
            g.angle = 0.0;
            g.rate = 0.0;
            g.calibrations += 1;
        })
    }
}

struct SimSolenoid {
    _claim: Claim,
    state: Shared,
    module_id: u8,
    channel: u8,
}

impl SolenoidDevice for SimSolenoid {
    fn set(&mut self, on: bool) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.check_write(DeviceAddress::Pneumatics {
            module_id: self.module_id,
            channel: Some(self.channel),
        })?;
        state.solenoids.insert((self.module_id, self.channel), on);
        Ok(())
    }

    fn get(&self) -> DeviceResult<bool> {
        Ok(self
            .state
            .lock()
            .solenoids
            .get(&(self.module_id, self.channel))
            .copied()
            .unwrap_or(false))
    }
}

struct SimCompressorDevice {
    _claim: Claim,
    state: Shared,
    module: ModuleType,
    module_id: u8,
}

impl SimCompressorDevice {
    fn set_enabled(&mut self, enabled: bool) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.check_write(DeviceAddress::Pneumatics {
            module_id: self.module_id,
            channel: None,
        })?;
        state.compressors.entry(self.module_id).or_default().enabled = enabled;
        Ok(())
    }
}

impl CompressorDevice for SimCompressorDevice {
    fn enable_digital(&mut self) -> DeviceResult<()> {
        self.set_enabled(true)
    }

    fn disable(&mut self) -> DeviceResult<()> {
        self.set_enabled(false)
    }

    fn is_enabled(&self) -> DeviceResult<bool> {
        Ok(self
            .state
            .lock()
            .compressors
            .get(&self.module_id)
            .map(|c| c.enabled)
            .unwrap_or(false))
    }

    fn pressure(&self) -> Option<f64> {
        // the CTRE PCM has no analog pressure input
        match self.module {
            ModuleType::Ctre => None,
            ModuleType::Rev => self
                .state
                .lock()
                .compressors
                .get(&self.module_id)
                .map(|c| c.pressure),
        }
    }
}

struct SimServo {
    _claim: Claim,
    state: Shared,
    channel: u8,
}

impl ServoDevice for SimServo {
    fn set_position(&mut self, position: f64) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.check_write(DeviceAddress::Pwm(self.channel))?;
        state.servos.insert(self.channel, position.clamp(0.0, 1.0));
        Ok(())
    }

    fn position(&self) -> DeviceResult<f64> {
        Ok(self
            .state
            .lock()
            .servos
            .get(&self.channel)
            .copied()
            .unwrap_or(0.0))
    }
}

struct SimEncoderDevice {
    _claim: Claim,
    state: Shared,
    channel_a: u8,
}

impl SimEncoderDevice {
    fn with<T>(&self, f: impl FnOnce(&mut SimEncoder) -> T) -> DeviceResult<T> {
        let mut state = self.state.lock();
        state
            .encoders
            .get_mut(&self.channel_a)
            .map(f)
            .ok_or_else(|| DeviceError::new(format!("no encoder on DIO {}", self.channel_a)))
    }
}

impl EncoderDevice for SimEncoderDevice {
    fn raw(&self) -> DeviceResult<i64> {
        self.with(|e| if e.reversed { -e.count } else { e.count })
    }

    fn distance(&self) -> DeviceResult<f64> {
        let raw = self.raw()?;
        self.with(|e| raw as f64 * e.distance_per_pulse)
    }

    fn rate(&self) -> DeviceResult<f64> {
        self.with(|e| {
            let sign = if e.reversed { -1.0 } else { 1.0 };
            sign * e.rate * e.distance_per_pulse
        })
    }

    fn set_distance_per_pulse(&mut self, distance: f64) -> DeviceResult<()> {
        self.with(|e| e.distance_per_pulse = distance)
    }

    fn reset(&mut self) -> DeviceResult<()> {
        self.with(|e| e.count = 0)
    }
}

struct SimAnalogInput {
    _claim: Claim,
    state: Shared,
    channel: u8,
}

impl SimAnalogInput {
    fn with<T>(&self, f: impl FnOnce(&mut SimAnalog) -> T) -> DeviceResult<T> {
        let mut state = self.state.lock();
        state
            .analog
            .get_mut(&self.channel)
            .map(f)
            .ok_or_else(|| DeviceError::new(format!("no analog input on AIN {}", self.channel)))
    }
}

impl AnalogInputDevice for SimAnalogInput {
    fn voltage(&self) -> DeviceResult<f64> {
        self.with(|a| a.voltage)
    }

    fn average_voltage(&self) -> DeviceResult<f64> {
        self.voltage()
    }

    fn value(&self) -> DeviceResult<i32> {
        self.with(|a| ((a.voltage / 5.0) * 4095.0).round().clamp(0.0, 4095.0) as i32)
    }

    fn set_average_bits(&mut self, bits: u32) -> DeviceResult<()> {
        self.with(|a| a.average_bits = bits)
    }

    fn set_oversample_bits(&mut self, bits: u32) -> DeviceResult<()> {
        self.with(|a| a.oversample_bits = bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_claim_twice_fails() {
        let sim = SimBackend::new();
        let _talon = sim.open_phoenix(PhoenixModel::TalonSrx, 3).unwrap();
        let err = sim.open_spark_max(3, SparkMotorKind::Brushless).err().unwrap();
        assert!(err.0.contains("already allocated"));
        assert_eq!(sim.opened_count(), 1);
    }

    #[test]
    fn test_drop_releases_claim() {
        let sim = SimBackend::new();
        let enc = sim
            .open_quadrature_encoder(4, 5, EncodingType::K4X, false)
            .unwrap();
        assert!(sim.is_claimed(DeviceAddress::Dio(5)));
        drop(enc);
        assert!(!sim.is_claimed(DeviceAddress::Dio(4)));
        assert!(!sim.is_claimed(DeviceAddress::Dio(5)));
        assert!(sim.open_digital_input(5).is_ok());
    }

    #[test]
    fn test_fail_open() {
        let sim = SimBackend::new();
        sim.fail_open(DeviceAddress::Can(5));
        assert!(sim.open_phoenix(PhoenixModel::VictorSpx, 5).is_err());
        assert!(!sim.is_claimed(DeviceAddress::Can(5)));
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_fail_writes() {
        let sim = SimBackend::new();
        let mut motor = sim.open_spark_max(1, SparkMotorKind::Brushless).unwrap();
        motor.set(0.5).unwrap();
        sim.fail_writes(DeviceAddress::Can(1));
        assert!(motor.set(0.7).is_err());
        assert_relative_eq!(sim.motor(1).unwrap().output, 0.5);
        sim.clear_faults();
        motor.set(0.7).unwrap();
        assert_eq!(sim.motor(1).unwrap().writes, 2);
    }

    #[test]
    fn test_step_integrates_position() {
        let sim = SimBackend::new().with_free_speed(10.0);
        let mut motor = sim.open_spark_max(2, SparkMotorKind::Brushless).unwrap();
        motor.set_inverted(true).unwrap();
        motor.set(0.5).unwrap();
        sim.step(0.1);
        sim.step(0.1);
        assert_relative_eq!(motor.encoder_position().unwrap(), -1.0);
        assert_relative_eq!(motor.encoder_velocity().unwrap(), -300.0);
    }

    #[test]
    fn test_victor_has_no_sensor() {
        let sim = SimBackend::new();
        let victor = sim.open_phoenix(PhoenixModel::VictorSpx, 4).unwrap();
        assert!(victor.selected_sensor_position().is_err());
        let mut talon = sim.open_phoenix(PhoenixModel::TalonSrx, 5).unwrap();
        talon.set_selected_sensor_position(2048.0).unwrap();
        assert_relative_eq!(talon.selected_sensor_position().unwrap(), 2048.0);
    }

    #[test]
    fn test_encoder_claims_both_channels() {
        let sim = SimBackend::new();
        let _enc = sim
            .open_quadrature_encoder(0, 1, EncodingType::K4X, false)
            .unwrap();
        assert!(sim.open_digital_input(1).is_err());
    }

    #[test]
    fn test_ctre_has_no_pressure() {
        let sim = SimBackend::new();
        let ctre = sim.open_compressor(ModuleType::Ctre, 0).unwrap();
        let rev = sim.open_compressor(ModuleType::Rev, 1).unwrap();
        sim.set_pressure(1, 110.0);
        assert!(ctre.pressure().is_none());
        assert_eq!(rev.pressure(), Some(110.0));
    }
}
