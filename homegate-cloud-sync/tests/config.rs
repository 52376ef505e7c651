use homegate_cloud_sync::CloudSyncConfig;

fn base_config() -> CloudSyncConfig {
    CloudSyncConfig {
        allow_working_offline: false,
        cloud_base_url: None,
        email: None,
        password: None,
        aws_integration: false,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        coap_addr: "127.0.0.1:5683".into(),
        comm_timeout_secs: 5,
        aws_poll_tick_secs: 5,
    }
}

#[test]
fn working_offline_disables_both_sinks_regardless_of_credentials() {
    let mut config = base_config();
    config.allow_working_offline = true;
    config.cloud_base_url = Some("https://cloud.example".into());
    config.email = Some("user@example.com".into());
    config.aws_integration = true;
    config.aws_access_key_id = Some("key".into());
    config.aws_secret_access_key = Some("secret".into());

    assert!(!config.proprietary_enabled());
    assert!(!config.aws_enabled());
}

#[test]
fn proprietary_sink_requires_base_url_and_email() {
    let mut config = base_config();
    assert!(!config.proprietary_enabled());

    config.cloud_base_url = Some("https://cloud.example".into());
    assert!(!config.proprietary_enabled());

    config.email = Some("user@example.com".into());
    assert!(config.proprietary_enabled());
}

#[test]
fn aws_sink_follows_the_aws_integration_flag() {
    let mut config = base_config();
    assert!(!config.aws_enabled());
    config.aws_integration = true;
    assert!(config.aws_enabled());
}
