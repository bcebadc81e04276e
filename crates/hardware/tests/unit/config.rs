//! # Configuration Tests
//!
//! Defaults, JSON deserialization and validation.

use dtemu_core::common::ConfigError;
use dtemu_core::config::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.general.arch, ArchKind::Mips);
    assert_eq!(config.general.cpus, 1);
    assert_eq!(config.general.start_pc, None);
    assert!(!config.general.trace);
    assert!(!config.general.debugger);
    assert!(config.validate().is_ok());
}

#[test]
fn test_section_defaults() {
    let config = Config::default();
    assert_eq!(config.memory.ram_base, 0);
    assert_eq!(config.memory.ram_size, 32 * 1024 * 1024);
    assert_eq!(config.sched.quota, 1024);
    assert_eq!(config.sched.other_quota, 1024);
    assert_eq!(config.sched.step, None);
    assert_eq!(config.cache.max_pages, 1024);
    assert_eq!(config.mmu.tlb_entries, 48);
}

#[test]
fn test_empty_json_is_default() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.general.cpus, 1);
    assert_eq!(config.sched.quota, 1024);
}

#[test]
fn test_partial_json_keeps_other_defaults() {
    let json = r#"{
        "general": { "arch": "i960", "cpus": 4, "start_pc": 4096 },
        "memory": { "ram_size": 1048576 },
        "sched": { "quota": 64, "step": 1 }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.general.arch, ArchKind::I960);
    assert_eq!(config.general.cpus, 4);
    assert_eq!(config.general.start_pc, Some(0x1000));
    assert_eq!(config.memory.ram_size, 0x10_0000);
    assert_eq!(config.memory.ram_base, 0);
    assert_eq!(config.sched.quota, 64);
    assert_eq!(config.sched.other_quota, 1024);
    assert_eq!(config.sched.step, Some(1));
    assert_eq!(config.mmu.tlb_entries, 48);
}

#[rstest]
#[case("mips", ArchKind::Mips)]
#[case("MIPS", ArchKind::Mips)]
#[case("mipsel", ArchKind::Mips)]
#[case("i960", ArchKind::I960)]
#[case("80960", ArchKind::I960)]
fn test_arch_names(#[case] name: &str, #[case] expected: ArchKind) {
    let json = format!(r#"{{ "general": {{ "arch": "{name}" }} }}"#);
    assert_eq!(Config::from_json(&json).unwrap().general.arch, expected);
}

#[rstest]
#[case(r#"{ "general": { "cpus": 0 } }"#, ConfigError::NoCpus)]
#[case(r#"{ "sched": { "quota": 0 } }"#, ConfigError::ZeroQuota)]
#[case(r#"{ "sched": { "other_quota": 0 } }"#, ConfigError::ZeroQuota)]
#[case(r#"{ "sched": { "step": 0 } }"#, ConfigError::ZeroQuota)]
#[case(r#"{ "memory": { "ram_size": 0 } }"#, ConfigError::RamSize(0))]
#[case(r#"{ "memory": { "ram_size": 4097 } }"#, ConfigError::RamSize(4097))]
#[case(r#"{ "cache": { "max_pages": 0 } }"#, ConfigError::ZeroCachePages)]
#[case(r#"{ "mmu": { "tlb_entries": 0 } }"#, ConfigError::TlbSize { got: 0, max: 64 })]
#[case(r#"{ "mmu": { "tlb_entries": 65 } }"#, ConfigError::TlbSize { got: 65, max: 64 })]
fn test_validation_rejects(#[case] json: &str, #[case] expected: ConfigError) {
    assert_eq!(Config::from_json(json).unwrap_err(), expected);
}

#[test]
fn test_unknown_arch_is_parse_error() {
    let err = Config::from_json(r#"{ "general": { "arch": "z80" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
}

#[test]
fn test_malformed_json_is_parse_error() {
    let err = Config::from_json("{ general: ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
}
