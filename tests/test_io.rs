mod common;
use common::temp_path;
use eegscope::io::{read_json, read_signal, write_json, write_signal, StWriter};
use eegscope::synth::generate_test_data;
use eegscope::{NormalizeMethod, RunConfig};

#[test]
fn recording_file_survives_a_write_and_read() {
    let sig = generate_test_data(2.0, 128.0, 4, 5).unwrap();
    let path = temp_path("recording.safetensors");
    write_signal(&path, &sig).unwrap();
    let back = read_signal(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(back.data, sig.data);
    assert_eq!(back.sampling_rate, 128.0);
    assert_eq!(back.channel_names, sig.channel_names);
}

#[test]
fn missing_file_error_names_the_path() {
    let path = temp_path("does-not-exist.safetensors");
    let err = read_signal(&path).unwrap_err();
    assert!(format!("{err:#}").contains("does-not-exist"));
}

#[test]
fn one_dimensional_data_is_a_single_channel() {
    let mut w = StWriter::new();
    w.add_f64("data", &[0.5; 300], &[300]);
    w.add_f64("sfreq", &[100.0], &[1]);
    w.add_metadata("ch_names", "Oz");
    let path = temp_path("mono.safetensors");
    w.write(&path).unwrap();
    let sig = read_signal(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(sig.data.dim(), (1, 300));
    assert_eq!(sig.channel_names, vec!["Oz".to_string()]);
}

#[test]
fn partial_run_config_fills_defaults() {
    let path = temp_path("partial.json");
    std::fs::write(&path, r#"{"preprocess": {"normalize": "minmax", "high_freq": 35.0}}"#).unwrap();
    let cfg: RunConfig = read_json(&path).unwrap();
    assert_eq!(cfg.preprocess.normalize, Some(NormalizeMethod::Minmax));
    assert_eq!(cfg.preprocess.high_freq, 35.0);
    assert_eq!(cfg.analysis, RunConfig::default().analysis);

    write_json(&path, &cfg).unwrap();
    let again: RunConfig = read_json(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(again, cfg);
}

#[test]
fn malformed_json_is_reported() {
    let path = temp_path("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let res: anyhow::Result<RunConfig> = read_json(&path);
    std::fs::remove_file(&path).ok();
    assert!(format!("{:#}", res.unwrap_err()).contains("parsing"));
}
