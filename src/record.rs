//! Sparse history-log records.
//!
//! A [`HistoryLog`] is one telemetry sample of a heat-pump installation. Every
//! slot of the schema is independently optional: presence lives in a bitmask,
//! values live in a flat array of raw 32-bit words decoded according to the
//! slot's [`FieldKind`]. The whole record is plain-old-data, so it can be
//! zeroed, copied and pushed through stages without touching the allocator.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Storage type of a schema slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Float,
    Short,
    Int,
    Flag,
}

macro_rules! history_schema {
    ($($variant:ident = $name:literal : $kind:ident),+ $(,)?) => {
        /// A named slot of the history-log schema.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[$(Field::$variant),+];
            pub const COUNT: usize = Self::ALL.len();

            pub const fn name(self) -> &'static str {
                match self {
                    $(Field::$variant => $name),+
                }
            }

            pub const fn kind(self) -> FieldKind {
                match self {
                    $(Field::$variant => FieldKind::$kind),+
                }
            }
        }
    };
}

history_schema! {
    Premium = "premium": Short,
    Temperature = "temperature": Float,
    Temperature2 = "temperature2": Float,
    Temperature3 = "temperature3": Float,
    Humidity = "humidity": Short,
    PowerOn = "powerOn": Flag,
    Fan = "fan": Flag,
    Pump = "pump": Flag,
    Speco = "speco": Float,
    Spdhw = "spdhw": Float,
    Defrost = "defrost": Short,
    Spantilegionella = "spantilegionella": Short,
    ExpansionValveOut = "expansionValveOut": Flag,
    ModbusGlobalFails = "modbusGlobalFails": Int,
    RefrigerantLiquid = "refrigerantLiquid": Float,
    AlarmDischargeTemp = "alarmDischargeTemp": Short,
    AlarmDriverInverter = "alarmDriverInverter": Short,
    CompressorPercentage = "compressorPercentage": Short,
    DischargeTemperature = "dischargeTemperature": Float,
    AntilegionellaDayWeek = "antilegionellaDayWeek": Short,
    PumpFlow = "pumpFlow": Float,
    Pr1 = "pr1": Float,
    Pr2 = "pr2": Float,
    Pr3 = "pr3": Float,
    Compressor = "compressor": Flag,
    CompressorHz = "compressorHz": Float,
    AuxGroupWatts = "auxGroupWatts": Short,
    AutoMode = "autoMode": Short,
    HeatFocus = "heatFocus": Short,
    TempHeating = "tempHeating": Float,
    ReturnTemp = "returnTemp": Float,
    OpModeHeating = "opModeHeating": Short,
    EvaporatorTemp = "evaporatorTemp": Float,
    EvaporationTemp = "evaporationTemp": Float,
    AirInlet = "airInlet": Float,
    AirOutlet = "airOutlet": Float,
    SetPointAir = "setPointAir": Float,
    OutsideTemp = "outsideTemp": Float,
    AlarmActive = "alarmActive": Short,
    ActivePower = "activePower": Float,
    TotalActivePower = "totalActivePower": Float,
    T1Temp = "t1Temp": Float,
    T2Temp = "t2Temp": Float,
    ThermalDiff = "thermalDiff": Float,
    ThermalPower = "thermalPower": Float,
    TotalThermalEnergy = "totalThermalEnergy": Float,
    LitersPerHourFlow = "litersPerHourFlow": Float,
    CopInstant = "copInstant": Float,
    PumpPercent = "pumpPercent": Short,
    Resistors = "resistors": Flag,
    SpHeating = "spHeating": Float,
    SpMode = "spMode": Short,
    DhwSpMode = "dhwSpMode": Short,
    AutoMinSpDhw = "autoMinSpDhw": Float,
    AlarmPumpFlow = "alarmPumpFlow": Short,
    AlarmAdcBoard = "alarmAdcBoard": Short,
    AlarmLp = "alarmLp": Short,
    AlarmHp = "alarmHp": Short,
    Sp1 = "sp1": Float,
    PowerOnHeating = "powerOnHeating": Short,
    Antilegionella = "antilegionella": Flag,
    Z1Sp = "z1Sp": Float,
    Z2Sp = "z2Sp": Float,
    PowerOnDhw = "powerOnDhw": Short,
    CoolingHeatingMode = "coolingHeatingMode": Short,
    ValveZ1 = "valveZ1": Flag,
    ValveZ2 = "valveZ2": Flag,
    TotalizerWh = "totalizerWh": Float,
    GasSuction = "gasSuction": Short,
    RunningFanPercent = "runningFanPercent": Short,
}

impl Field {
    /// Looks a slot up by its schema name, e.g. `"compressorHz"`.
    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    #[inline(always)]
    const fn mask(self) -> (usize, u64) {
        let idx = self as usize;
        (idx >> 6, 1u64 << (idx & 63))
    }
}

const PRESENCE_WORDS: usize = Field::COUNT.div_ceil(64);

/// A typed slot value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Short(i16),
    Int(i32),
    Flag(bool),
}

impl Value {
    pub fn kind(self) -> FieldKind {
        match self {
            Value::Float(_) => FieldKind::Float,
            Value::Short(_) => FieldKind::Short,
            Value::Int(_) => FieldKind::Int,
            Value::Flag(_) => FieldKind::Flag,
        }
    }

    #[inline(always)]
    fn to_bits(self) -> u32 {
        match self {
            Value::Float(v) => v.to_bits(),
            Value::Short(v) => v as u16 as u32,
            Value::Int(v) => v as u32,
            Value::Flag(v) => v as u32,
        }
    }

    #[inline(always)]
    fn from_bits(kind: FieldKind, bits: u32) -> Self {
        match kind {
            FieldKind::Float => Value::Float(f32::from_bits(bits)),
            FieldKind::Short => Value::Short(bits as u16 as i16),
            FieldKind::Int => Value::Int(bits as i32),
            FieldKind::Flag => Value::Flag(bits != 0),
        }
    }
}

/// One telemetry sample with every schema slot optional.
///
/// The zeroed record has no slot present. Values of absent slots are never
/// observed through the accessors, so a record can be reused across samples
/// by calling [`HistoryLog::clear_all`] and setting the new slots.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct HistoryLog {
    present: [u64; PRESENCE_WORDS],
    values: [u32; Field::COUNT],
}

impl HistoryLog {
    pub fn empty() -> Self {
        Self::zeroed()
    }

    #[inline(always)]
    pub fn is_present(&self, field: Field) -> bool {
        let (word, bit) = field.mask();
        self.present[word] & bit != 0
    }

    /// Number of slots carrying a value.
    pub fn present_count(&self) -> u32 {
        self.present.iter().map(|w| w.count_ones()).sum()
    }

    #[inline(always)]
    fn raw(&self, field: Field) -> Option<u32> {
        if self.is_present(field) {
            Some(self.values[field as usize])
        } else {
            None
        }
    }

    #[inline(always)]
    fn put_raw(&mut self, field: Field, bits: u32) {
        let (word, bit) = field.mask();
        self.values[field as usize] = bits;
        self.present[word] |= bit;
    }

    pub fn get(&self, field: Field) -> Option<Value> {
        self.raw(field).map(|bits| Value::from_bits(field.kind(), bits))
    }

    pub fn set(&mut self, field: Field, value: Value) {
        debug_assert_eq!(field.kind(), value.kind(), "kind mismatch on {}", field.name());
        self.put_raw(field, value.to_bits());
    }

    #[inline(always)]
    pub fn float(&self, field: Field) -> Option<f32> {
        debug_assert_eq!(field.kind(), FieldKind::Float);
        self.raw(field).map(f32::from_bits)
    }

    #[inline(always)]
    pub fn short(&self, field: Field) -> Option<i16> {
        debug_assert_eq!(field.kind(), FieldKind::Short);
        self.raw(field).map(|bits| bits as u16 as i16)
    }

    #[inline(always)]
    pub fn int(&self, field: Field) -> Option<i32> {
        debug_assert_eq!(field.kind(), FieldKind::Int);
        self.raw(field).map(|bits| bits as i32)
    }

    #[inline(always)]
    pub fn flag(&self, field: Field) -> Option<bool> {
        debug_assert_eq!(field.kind(), FieldKind::Flag);
        self.raw(field).map(|bits| bits != 0)
    }

    #[inline(always)]
    pub fn set_float(&mut self, field: Field, value: f32) {
        self.set(field, Value::Float(value));
    }

    #[inline(always)]
    pub fn set_short(&mut self, field: Field, value: i16) {
        self.set(field, Value::Short(value));
    }

    #[inline(always)]
    pub fn set_int(&mut self, field: Field, value: i32) {
        self.set(field, Value::Int(value));
    }

    #[inline(always)]
    pub fn set_flag(&mut self, field: Field, value: bool) {
        self.set(field, Value::Flag(value));
    }

    pub fn with_float(mut self, field: Field, value: f32) -> Self {
        self.set_float(field, value);
        self
    }

    pub fn with_short(mut self, field: Field, value: i16) -> Self {
        self.set_short(field, value);
        self
    }

    pub fn with_int(mut self, field: Field, value: i32) -> Self {
        self.set_int(field, value);
        self
    }

    pub fn with_flag(mut self, field: Field, value: bool) -> Self {
        self.set_flag(field, value);
        self
    }

    /// Marks the slot absent. The stale value stays in storage but is unreachable.
    #[inline(always)]
    pub fn clear(&mut self, field: Field) {
        let (word, bit) = field.mask();
        self.present[word] &= !bit;
    }

    #[inline(always)]
    pub fn clear_all(&mut self) {
        self.present = [0; PRESENCE_WORDS];
    }

    /// Iterates present slots in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, Value)> + '_ {
        Field::ALL
            .iter()
            .filter_map(move |&f| self.get(f).map(|v| (f, v)))
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for HistoryLog {
    fn eq(&self, other: &Self) -> bool {
        self.present == other.present
            && Field::ALL
                .iter()
                .all(|&f| self.raw(f) == other.raw(f))
    }
}

impl fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(field, value)| (field.name(), value)))
            .finish()
    }
}

/// The aggregated view of a record.
///
/// Only these four slots feed bucket statistics; everything else a record
/// carries is pass-through data.
pub trait Telemetry {
    fn temperature(&self) -> Option<f32>;
    fn active_power(&self) -> Option<f32>;
    fn compressor_hz(&self) -> Option<f32>;
    /// Alarm code; values above zero mean an alarm is active.
    fn alarm_active(&self) -> Option<i16>;
}

impl Telemetry for HistoryLog {
    #[inline(always)]
    fn temperature(&self) -> Option<f32> {
        self.float(Field::Temperature)
    }

    #[inline(always)]
    fn active_power(&self) -> Option<f32> {
        self.float(Field::ActivePower)
    }

    #[inline(always)]
    fn compressor_hz(&self) -> Option<f32> {
        self.float(Field::CompressorHz)
    }

    #[inline(always)]
    fn alarm_active(&self) -> Option<i16> {
        self.short(Field::AlarmActive)
    }
}

/// Tagged-optional record carrying only the aggregated slots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SparseReading {
    pub temperature: Option<f32>,
    pub active_power: Option<f32>,
    pub compressor_hz: Option<f32>,
    pub alarm_active: Option<i16>,
}

impl Telemetry for SparseReading {
    #[inline(always)]
    fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    #[inline(always)]
    fn active_power(&self) -> Option<f32> {
        self.active_power
    }

    #[inline(always)]
    fn compressor_hz(&self) -> Option<f32> {
        self.compressor_hz
    }

    #[inline(always)]
    fn alarm_active(&self) -> Option<i16> {
        self.alarm_active
    }
}

impl From<&HistoryLog> for SparseReading {
    fn from(log: &HistoryLog) -> Self {
        Self {
            temperature: log.temperature(),
            active_power: log.active_power(),
            compressor_hz: log.compressor_hz(),
            alarm_active: log.alarm_active(),
        }
    }
}
