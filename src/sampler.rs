//! Averaged analog readings of phase current and bus voltage.
use crate::hardware::{AnalogChannel, Hardware};

/// ADC front end and sense-chain scaling
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Volts at full scale
    pub adc_reference: f32,
    /// Counts at full scale
    pub adc_max_count: u16,
    /// Current sense gain, volts per amp
    pub current_sense_ratio: f32,
    /// Bus divider ratio, input volts per sensed volt
    pub bus_divider_ratio: f32,
    /// Samples per averaged reading
    pub samples: u32,
    /// Settling delay after each sample
    pub sample_delay_ms: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            adc_reference: 3.3,
            adc_max_count: 4095,
            // 5 mOhm shunt into a 10x amplifier
            current_sense_ratio: 0.05,
            // 60 V rail scaled to 3.2 V
            bus_divider_ratio: 60. / 3.2,
            samples: 10,
            sample_delay_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    config: SamplerConfig,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Sampler { config }
    }

    pub fn counts_to_volts(&self, counts: u16) -> f32 {
        counts as f32 * self.config.adc_reference / self.config.adc_max_count as f32
    }

    /// Amps, averaged over the configured sample count
    pub fn read_current<H: Hardware>(&self, hardware: &mut H) -> f32 {
        self.read_current_averaged(hardware, self.config.samples)
    }

    /// Amps, averaged over `samples` readings
    pub fn read_current_averaged<H: Hardware>(&self, hardware: &mut H, samples: u32) -> f32 {
        let sensed = self.average(hardware, AnalogChannel::CurrentSense, samples);
        sensed / self.config.current_sense_ratio
    }

    /// Supply rail volts, averaged over the configured sample count
    pub fn read_bus_voltage<H: Hardware>(&self, hardware: &mut H) -> f32 {
        let sensed = self.average(hardware, AnalogChannel::BusVoltage, self.config.samples);
        sensed * self.config.bus_divider_ratio
    }

    fn average<H: Hardware>(
        &self,
        hardware: &mut H,
        channel: AnalogChannel,
        samples: u32,
    ) -> f32 {
        // Zero samples would divide by zero, take at least one
        let samples = samples.max(1);
        let mut total = 0.;
        for _ in 0..samples {
            total += self.counts_to_volts(hardware.read_analog(channel));
            hardware.delay_ms(self.config.sample_delay_ms);
        }
        total / samples as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBoard;

    #[test]
    fn current_is_the_mean_of_the_samples() {
        let config = SamplerConfig {
            adc_reference: 3.3,
            adc_max_count: 3300,
            current_sense_ratio: 1.,
            bus_divider_ratio: 1.,
            samples: 4,
            sample_delay_ms: 1,
        };
        let mut board = SimBoard::new(config);
        board.queue_current_counts(&[100, 200, 300, 400]);

        let amps = Sampler::new(config).read_current(&mut board);

        assert!((amps - 0.25).abs() < 1E-6, "got {}", amps);
        // One settling delay per sample
        assert_eq!(board.now_ms(), 4);
    }

    #[test]
    fn bus_voltage_applies_divider() {
        let config = SamplerConfig::default();
        let mut board = SimBoard::new(config);
        board.set_bus_voltage(24.);

        let volts = Sampler::new(config).read_bus_voltage(&mut board);

        assert!((volts - 24.).abs() < 0.05, "got {}", volts);
    }
}
