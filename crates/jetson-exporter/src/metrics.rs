// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Projection of a parsed [`Snapshot`] onto Prometheus gauges.
//!
//! Every gauge vector is reset before a snapshot is projected, so the exposed set always
//! reflects exactly one `tegrastats` line. Memory sizes are exposed in megabytes, frequencies in
//! MHz and rails in mW.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tegrastats::governor::Governor;
use tegrastats::parser::{megabytes, FrequencyDomainReading, MemoryRegion, Snapshot};
use tracing::debug;

use crate::error::ExporterError;

/// Content type of [`TegrastatsMetrics::encode`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

pub struct TegrastatsMetrics {
    registry: Registry,
    ram: GaugeVec,
    iram: GaugeVec,
    swap: GaugeVec,
    cpu: GaugeVec,
    gr3d_freq: GaugeVec,
    emc_freq: GaugeVec,
    gr3d: GaugeVec,
    vdd: GaugeVec,
    temp: GaugeVec,
    mts: GaugeVec,
}

impl TegrastatsMetrics {
    pub fn new(namespace: &str) -> Result<Self, ExporterError> {
        let registry = Registry::new();
        let gauge = |name: &str, help: &str, labels: &[&str]| -> Result<GaugeVec, ExporterError> {
            let gauge = GaugeVec::new(Opts::new(name, help).namespace(namespace), labels)
                .map_err(ExporterError::Registration)?;
            registry
                .register(Box::new(gauge.clone()))
                .map_err(ExporterError::Registration)?;
            Ok(gauge)
        };

        Ok(Self {
            ram: gauge("ram", "Memory usage in MB", &["statistic"])?,
            iram: gauge("iram", "IRAM usage in MB", &["statistic"])?,
            swap: gauge("swap", "Swap usage in MB", &["statistic"])?,
            cpu: gauge(
                "cpu",
                "Per-core status, load (%), frequency (MHz) and scaling governor",
                &["number", "statistic"],
            )?,
            gr3d_freq: gauge(
                "gr3d_freq",
                "GPU utilization (%) and frequency (MHz)",
                &["statistic"],
            )?,
            emc_freq: gauge(
                "emc_freq",
                "External memory controller utilization (%) and frequency (MHz)",
                &["statistic"],
            )?,
            gr3d: gauge("gr3d", "GPU usage (%) and frequency (MHz)", &["statistic"])?,
            vdd: gauge(
                "vdd",
                "Power rail current and average draw in mW",
                &["label", "statistic"],
            )?,
            temp: gauge("temp", "Sensor temperature in Celsius", &["sensor"])?,
            mts: gauge(
                "mts",
                "Memory transaction scheduler foreground and background load (%)",
                &["statistic"],
            )?,
            registry,
        })
    }

    /// Replaces every exposed sample with the values of `snapshot`.
    pub fn project(&self, snapshot: &Snapshot) {
        self.reset();

        if let Some(ram) = &snapshot.ram {
            set_region(&self.ram, ram);
            if let Some(lfb) = &ram.largest_free_block {
                set(
                    &self.ram,
                    &["lfb_size"],
                    megabytes(lfb.size.value, &lfb.size.unit),
                );
                if let Some(count) = lfb.count {
                    set(&self.ram, &["lfb_nblock"], count as f64);
                }
            }
        }
        if let Some(iram) = &snapshot.iram {
            set_region(&self.iram, iram);
            if let Some(lfb) = &iram.largest_free_block {
                set(&self.iram, &["lfb"], megabytes(lfb.size.value, &lfb.size.unit));
            }
        }
        if let Some(swap) = &snapshot.swap {
            set_region(&self.swap, swap);
            if let Some(cached) = &swap.cached {
                set(&self.swap, &["cached"], megabytes(cached.value, &cached.unit));
            }
        }

        for core in snapshot.cpus.values() {
            let number = core.index.to_string();
            if !core.online {
                set(&self.cpu, &[&number, "status"], 0.0);
                continue;
            }
            set(&self.cpu, &[&number, "status"], 1.0);
            if let Some(load) = core.load {
                set(&self.cpu, &[&number, "load"], f64::from(load));
            }
            if let Some(frequency) = core.frequency {
                set(&self.cpu, &[&number, "frequency"], f64::from(frequency));
            }
            if let Some(name) = &core.governor {
                let ordinal = Governor::from_name(name).ordinal();
                set(&self.cpu, &[&number, "governor"], ordinal as f64);
            }
        }

        if let Some(reading) = &snapshot.gr3d_freq {
            set_domain(&self.gr3d_freq, reading, "utilization_percentage", "frequency");
        }
        if let Some(reading) = &snapshot.emc_freq {
            set_domain(&self.emc_freq, reading, "utilization_percentage", "frequency");
        }
        if let Some(reading) = &snapshot.gr3d {
            set_domain(&self.gr3d, reading, "use", "freq");
        }

        for rail in snapshot.rails.values() {
            set(&self.vdd, &[&rail.name, "current"], rail.current as f64);
            set(&self.vdd, &[&rail.name, "average"], rail.average as f64);
        }

        for (sensor, celsius) in &snapshot.temperatures {
            set(&self.temp, &[sensor], *celsius);
        }

        if let Some(mts) = &snapshot.mts {
            set(&self.mts, &["fg"], f64::from(mts.foreground));
            set(&self.mts, &["bg"], f64::from(mts.background));
        }

        debug!(
            "Projected {} cores, {} rails and {} temperatures",
            snapshot.cpus.len(),
            snapshot.rails.len(),
            snapshot.temperatures.len()
        );
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>, ExporterError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(ExporterError::Encode)?;
        Ok(buffer)
    }

    fn reset(&self) {
        for gauge in [
            &self.ram,
            &self.iram,
            &self.swap,
            &self.cpu,
            &self.gr3d_freq,
            &self.emc_freq,
            &self.gr3d,
            &self.vdd,
            &self.temp,
            &self.mts,
        ] {
            gauge.reset();
        }
    }
}

fn set(gauge: &GaugeVec, labels: &[&str], value: f64) {
    gauge.with_label_values(labels).set(value);
}

fn set_region(gauge: &GaugeVec, region: &MemoryRegion) {
    set(gauge, &["used"], megabytes(region.used, &region.unit));
    set(gauge, &["total"], megabytes(region.total, &region.unit));
}

fn set_domain(gauge: &GaugeVec, reading: &FrequencyDomainReading, usage: &str, frequency: &str) {
    set(gauge, &[usage], f64::from(reading.utilization));
    if let Some(mhz) = reading.frequency {
        set(gauge, &[frequency], f64::from(mhz));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tegrastats::governor::{GovernorLookup, GovernorReader};
    use tegrastats::parser;

    const LINE: &str = "RAM 1728/7763MB (lfb 1117x4MB) IRAM 0/252kB(lfb 252kB) SWAP 0/3882MB (cached 0MB) CPU [5%@1190,1%@1190,off,off,off,off] EMC_FREQ 0% GR3D_FREQ 0% AO@35.5C GPU@35.5C PMIC@100C AUX@35.5C CPU@36C thermal@35.65C VDD_IN 3757/3757 VDD_CPU_GPU_CV 197/197 VDD_SOC 1066/1066 MTS fg 12% bg 13% GR3D 14%@36";

    struct Governors(HashMap<usize, GovernorLookup>);

    impl GovernorReader for Governors {
        fn read(&self, core: usize) -> GovernorLookup {
            self.0
                .get(&core)
                .cloned()
                .unwrap_or(GovernorLookup::Unsupported)
        }
    }

    fn governors() -> Governors {
        let mut governors = HashMap::new();
        governors.insert(0, GovernorLookup::Found("schedutil".to_string()));
        governors.insert(1, GovernorLookup::Found("interactive".to_string()));
        Governors(governors)
    }

    /// Exposed samples keyed by `name{labels}`.
    fn samples(metrics: &TegrastatsMetrics) -> HashMap<String, f64> {
        let text = String::from_utf8(metrics.encode().unwrap()).unwrap();
        text.lines()
            .filter(|line| !line.starts_with('#') && !line.is_empty())
            .map(|line| {
                let (series, value) = line.rsplit_once(' ').unwrap();
                (series.to_string(), value.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_project_sample_line() {
        let metrics = TegrastatsMetrics::new("nvidia_jetson").unwrap();
        metrics.project(&parser::parse(LINE, &governors()));
        let samples = samples(&metrics);

        assert_eq!(samples[r#"nvidia_jetson_ram{statistic="used"}"#], 1728.0);
        assert_eq!(samples[r#"nvidia_jetson_ram{statistic="total"}"#], 7763.0);
        assert_eq!(samples[r#"nvidia_jetson_ram{statistic="lfb_size"}"#], 4.0);
        assert_eq!(samples[r#"nvidia_jetson_ram{statistic="lfb_nblock"}"#], 1117.0);

        // kB normalized to MB
        assert_eq!(samples[r#"nvidia_jetson_iram{statistic="total"}"#], 252.0 / 1024.0);
        assert_eq!(samples[r#"nvidia_jetson_iram{statistic="lfb"}"#], 252.0 / 1024.0);

        assert_eq!(samples[r#"nvidia_jetson_swap{statistic="total"}"#], 3882.0);
        assert_eq!(samples[r#"nvidia_jetson_swap{statistic="cached"}"#], 0.0);

        assert_eq!(samples[r#"nvidia_jetson_cpu{number="0",statistic="status"}"#], 1.0);
        assert_eq!(samples[r#"nvidia_jetson_cpu{number="0",statistic="load"}"#], 5.0);
        assert_eq!(
            samples[r#"nvidia_jetson_cpu{number="0",statistic="frequency"}"#],
            1190.0
        );
        assert_eq!(samples[r#"nvidia_jetson_cpu{number="0",statistic="governor"}"#], 0.0);
        assert_eq!(
            samples[r#"nvidia_jetson_cpu{number="1",statistic="governor"}"#],
            -1.0
        );
        assert_eq!(samples[r#"nvidia_jetson_cpu{number="3",statistic="status"}"#], 0.0);
        assert!(!samples.contains_key(r#"nvidia_jetson_cpu{number="3",statistic="load"}"#));

        assert_eq!(
            samples[r#"nvidia_jetson_gr3d_freq{statistic="utilization_percentage"}"#],
            0.0
        );
        assert!(!samples.contains_key(r#"nvidia_jetson_gr3d_freq{statistic="frequency"}"#));
        assert!(!samples.contains_key(r#"nvidia_jetson_emc_freq{statistic="frequency"}"#));
        assert_eq!(samples[r#"nvidia_jetson_gr3d{statistic="use"}"#], 14.0);
        assert_eq!(samples[r#"nvidia_jetson_gr3d{statistic="freq"}"#], 36.0);

        assert_eq!(
            samples[r#"nvidia_jetson_vdd{label="IN",statistic="current"}"#],
            3757.0
        );
        assert_eq!(
            samples[r#"nvidia_jetson_vdd{label="CPU_GPU_CV",statistic="average"}"#],
            197.0
        );

        assert_eq!(samples[r#"nvidia_jetson_temp{sensor="thermal"}"#], 35.65);
        assert_eq!(samples[r#"nvidia_jetson_temp{sensor="PMIC"}"#], 100.0);

        assert_eq!(samples[r#"nvidia_jetson_mts{statistic="fg"}"#], 12.0);
        assert_eq!(samples[r#"nvidia_jetson_mts{statistic="bg"}"#], 13.0);
    }

    #[test]
    fn test_project_replaces_previous_snapshot() {
        let metrics = TegrastatsMetrics::new("nvidia_jetson").unwrap();
        metrics.project(&parser::parse(LINE, &governors()));
        metrics.project(&parser::parse("MTS fg 1% bg 2%", &governors()));
        let samples = samples(&metrics);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[r#"nvidia_jetson_mts{statistic="fg"}"#], 1.0);
        assert_eq!(samples[r#"nvidia_jetson_mts{statistic="bg"}"#], 2.0);
    }

    #[test]
    fn test_empty_snapshot_has_no_samples() {
        let metrics = TegrastatsMetrics::new("nvidia_jetson").unwrap();
        metrics.project(&Snapshot::default());
        assert!(samples(&metrics).is_empty());
    }

    #[test]
    fn test_custom_namespace() {
        let metrics = TegrastatsMetrics::new("orin").unwrap();
        metrics.project(&parser::parse("GR3D 14%@36", &governors()));
        assert_eq!(samples(&metrics)[r#"orin_gr3d{statistic="use"}"#], 14.0);
    }

    #[test]
    fn test_invalid_namespace_fails_registration() {
        assert!(matches!(
            TegrastatsMetrics::new("nvidia-jetson"),
            Err(ExporterError::Registration(_))
        ));
    }
}
