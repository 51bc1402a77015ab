//! Synthetic heat-pump history logs.
//!
//! Mirrors the production generator used for capacity tests: one log per
//! minute, every slot present with probability 0.9, and an alarm code in
//! `0..10` raised on roughly 2% of the logs that carry `alarmActive`.

use historial_buckets::{Field, FieldKind, HistoryLog, TimedLog};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const PRESENCE_PROBABILITY: f64 = 0.9;
pub const ALARM_PROBABILITY: f64 = 0.02;
pub const MINUTE_NANOS: i64 = 60 * 1_000_000_000;

/// Exclusive upper bound of the values a slot takes.
fn upper_bound(field: Field) -> f64 {
    use Field::*;
    match field {
        PowerOn | Fan | Pump | ExpansionValveOut | Compressor | Resistors | Antilegionella
        | ValveZ1 | ValveZ2 => 1.0,
        Premium | AlarmDischargeTemp | AlarmDriverInverter | HeatFocus | AlarmPumpFlow
        | AlarmAdcBoard | AlarmLp | AlarmHp | PowerOnHeating | PowerOnDhw => 2.0,
        AutoMode | SpMode | DhwSpMode | CoolingHeatingMode => 3.0,
        OpModeHeating => 4.0,
        Defrost | RefrigerantLiquid | EvaporationTemp => 5.0,
        CopInstant => 6.0,
        AntilegionellaDayWeek => 7.0,
        Speco | EvaporatorTemp | ThermalDiff | ModbusGlobalFails | GasSuction | AlarmActive => 10.0,
        AirOutlet => 15.0,
        SetPointAir => 22.0,
        AirInlet | Z1Sp | Z2Sp => 25.0,
        Pr1 | Pr2 | Pr3 => 30.0,
        Temperature | Temperature2 | Temperature3 | T2Temp => 40.0,
        ReturnTemp | OutsideTemp | AutoMinSpDhw => 45.0,
        TempHeating | T1Temp | Sp1 => 50.0,
        SpHeating => 55.0,
        Spdhw => 60.0,
        Spantilegionella => 70.0,
        CompressorHz => 90.0,
        Humidity | CompressorPercentage | PumpPercent | RunningFanPercent => 100.0,
        DischargeTemperature => 120.0,
        PumpFlow => 1000.0,
        LitersPerHourFlow => 1500.0,
        ActivePower => 3500.0,
        ThermalPower => 5000.0,
        AuxGroupWatts => 6000.0,
        TotalActivePower => 100_000.0,
        TotalThermalEnergy => 200_000.0,
        TotalizerWh => 300_000.0,
    }
}

pub struct LogGenerator {
    rng: StdRng,
    start_nanos: i64,
    index: i64,
    log: HistoryLog,
}

impl LogGenerator {
    pub fn new(seed: u64, start_nanos: i64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start_nanos,
            index: 0,
            log: HistoryLog::empty(),
        }
    }

    /// Overwrites `log` with a fresh sample, reusing its storage.
    pub fn fill(&mut self, log: &mut HistoryLog) {
        log.clear_all();
        for &field in Field::ALL {
            if !self.rng.random_bool(PRESENCE_PROBABILITY) {
                continue;
            }
            let bound = upper_bound(field);
            match field.kind() {
                FieldKind::Float => {
                    log.set_float(field, (self.rng.random::<f64>() * bound) as f32);
                }
                FieldKind::Short if field == Field::AlarmActive => {
                    let code = if self.rng.random_bool(ALARM_PROBABILITY) {
                        self.rng.random_range(0..bound as i16)
                    } else {
                        0
                    };
                    log.set_short(field, code);
                }
                FieldKind::Short => log.set_short(field, self.rng.random_range(0..bound as i16)),
                FieldKind::Int => log.set_int(field, self.rng.random_range(0..bound as i32)),
                FieldKind::Flag => log.set_flag(field, self.rng.random_bool(0.5)),
            }
        }
    }

    pub fn next_timed(&mut self) -> TimedLog {
        let mut log = self.log;
        self.fill(&mut log);
        self.log = log;
        let timestamp_nanos = self.start_nanos + self.index * MINUTE_NANOS;
        self.index += 1;
        TimedLog::new(timestamp_nanos, log)
    }
}

impl Iterator for LogGenerator {
    type Item = TimedLog;

    fn next(&mut self) -> Option<TimedLog> {
        Some(self.next_timed())
    }
}
