// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tegrastats::governor::{Governor, SysfsGovernorReader};
use tegrastats::parser::{self, FrequencyDomainReading, SchedulerLoad};
use tegrastats::sampler::{SampleSource, Tegrastats};

const SAMPLE_LINE: &str = "RAM 1728/7763MB (lfb 1117x4MB) IRAM 1728/7763MB (lfb 1117MB) SWAP 0/3882MB (cached 0MB) CPU [5%@1190,1%@1190,off,off,off,off] EMC_FREQ 0% GR3D_FREQ 0% AO@35.5C GPU@35.5C PMIC@100C AUX@35.5C CPU@36C thermal@35.65C VDD_IN 3757/3757 VDD_CPU_GPU_CV 197/197 VDD_SOC 1066/1066 MTS fg 12% bg 13% GR3D 14%@36";

fn sysfs_with_governors(root: &Path, governors: &[&str]) {
    for (core, name) in governors.iter().enumerate() {
        let dir = root.join(format!("cpu{core}/cpufreq"));
        fs::create_dir_all(&dir).expect("failed to create cpufreq dir");
        fs::write(dir.join("scaling_governor"), format!("{name}\n"))
            .expect("failed to write governor");
    }
}

#[test]
fn parses_full_sample_line() {
    let sysfs = tempfile::tempdir().expect("failed to create tempdir");
    sysfs_with_governors(sysfs.path(), &["schedutil", "schedutil"]);
    let governors = SysfsGovernorReader::with_root(sysfs.path());

    let snapshot = parser::parse(SAMPLE_LINE, &governors);

    let swap = snapshot.swap.expect("swap section");
    assert_eq!((swap.used, swap.total, swap.unit.as_str()), (0, 3882, "M"));
    assert_eq!(swap.cached.expect("swap cached").value, 0);

    let ram = snapshot.ram.expect("ram section");
    assert_eq!((ram.used, ram.total, ram.unit.as_str()), (1728, 7763, "M"));
    let lfb = ram.largest_free_block.expect("ram lfb");
    assert_eq!(lfb.count, Some(1117));
    assert_eq!(lfb.size.value, 4);

    assert_eq!(snapshot.cpus.len(), 6);
    let core0 = &snapshot.cpus[&0];
    assert!(core0.online);
    assert_eq!(core0.load, Some(5));
    assert_eq!(core0.frequency, Some(1190));
    assert_eq!(
        core0.governor.as_deref().map(Governor::from_name),
        Some(Governor::Schedutil)
    );
    for core in 2..6 {
        assert!(!snapshot.cpus[&core].online);
    }

    let temperatures: Vec<(&str, f64)> = snapshot
        .temperatures
        .iter()
        .map(|(sensor, celsius)| (sensor.as_str(), *celsius))
        .collect();
    assert_eq!(
        temperatures,
        vec![
            ("AO", 35.5),
            ("AUX", 35.5),
            ("CPU", 36.0),
            ("GPU", 35.5),
            ("PMIC", 100.0),
            ("thermal", 35.65),
        ]
    );

    assert_eq!(
        snapshot.rails.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["CPU_GPU_CV", "IN", "SOC"]
    );
    assert_eq!(snapshot.rails["IN"].current, 3757);

    assert_eq!(
        snapshot.mts,
        Some(SchedulerLoad {
            foreground: 12,
            background: 13
        })
    );
    assert_eq!(
        snapshot.gr3d,
        Some(FrequencyDomainReading {
            utilization: 14,
            frequency: Some(36)
        })
    );
    assert_eq!(snapshot.gr3d_freq.expect("gr3d_freq").frequency, None);
}

#[test]
fn missing_governors_truncate_online_cores() {
    let sysfs = tempfile::tempdir().expect("failed to create tempdir");
    let governors = SysfsGovernorReader::with_root(sysfs.path());

    let snapshot = parser::parse(SAMPLE_LINE, &governors);

    assert!(snapshot.cpus.is_empty());
    assert!(snapshot.ram.is_some());
}

#[test]
fn unrecognized_line_is_empty_snapshot() {
    let sysfs = tempfile::tempdir().expect("failed to create tempdir");
    let governors = SysfsGovernorReader::with_root(sysfs.path());

    assert!(parser::parse("nothing to see here", &governors).is_empty());
}

#[test]
fn parses_line_read_from_log() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let sampler = Tegrastats::new("/usr/bin/tegrastats", dir.path());
    fs::write(
        sampler.log_file(),
        format!("RAM 1/2MB (lfb 1x4MB)\n{SAMPLE_LINE}\nRAM 9/9M"),
    )
    .expect("failed to write log");

    let line = sampler.read_latest().expect("a complete line");
    assert_eq!(line, SAMPLE_LINE);

    let governors = SysfsGovernorReader::with_root(dir.path());
    assert_eq!(parser::parse(&line, &governors).ram.expect("ram").used, 1728);
}

proptest! {
    #[test]
    fn parse_is_deterministic(line in ".{0,200}") {
        let sysfs = tempfile::tempdir().expect("failed to create tempdir");
        sysfs_with_governors(sysfs.path(), &["performance"]);
        let governors = SysfsGovernorReader::with_root(sysfs.path());

        prop_assert_eq!(parser::parse(&line, &governors), parser::parse(&line, &governors));
    }

    #[test]
    fn sample_fragments_never_fail(used in 0u64..100_000, total in 0u64..100_000, load in 0u32..100) {
        let line = format!("RAM {used}/{total}MB (lfb 3x4MB) CPU [{load}%@1190,off] MTS fg {load}% bg 0%");
        let sysfs = tempfile::tempdir().expect("failed to create tempdir");
        sysfs_with_governors(sysfs.path(), &["ondemand", "ondemand"]);
        let governors = SysfsGovernorReader::with_root(sysfs.path());

        let snapshot = parser::parse(&line, &governors);
        let ram = snapshot.ram.expect("ram section");
        prop_assert_eq!(ram.used, used);
        prop_assert_eq!(ram.total, total);
        prop_assert_eq!(snapshot.cpus.len(), 2);
        prop_assert_eq!(snapshot.cpus[&0].load, Some(load));
        prop_assert_eq!(snapshot.mts.expect("mts").foreground, load);
    }
}
