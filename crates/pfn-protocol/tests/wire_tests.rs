use pfn_protocol::*;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Reading {
    sensor: String,
    value: i64,
}

impl DataItem for Reading {
    fn parse_line(raw: &str, _content_type: &str) -> Result<Self, ProtocolError> {
        let (sensor, value) = raw
            .split_once('\t')
            .ok_or_else(|| ProtocolError::InvalidRecord(raw.to_string()))?;
        let value = value
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidRecord(raw.to_string()))?;
        Ok(Reading {
            sensor: sensor.to_string(),
            value,
        })
    }

    fn from_wire(body: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(body)?)
    }

    fn to_wire_body(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn identity(&self) -> &str {
        &self.sensor
    }

    fn merge_from(&mut self, other: &Self) {
        self.value = other.value;
    }
}

#[test]
fn test_serialize_parse_serialize_is_stable() {
    let packages: Vec<Package<Reading>> = vec![
        Package::control(ControlCommand::Ping),
        Package::control(ControlCommand::ReadFile),
        Package::control(ControlCommand::Shutdown),
        Package::data_text(r#"{"sensor":"t1","value":4}"#),
        Package::data_text("plain text: with a colon"),
        Package::data_item(Reading {
            sensor: "t2".into(),
            value: -7,
        }),
        Package::new(PackageKind::Data),
    ];

    for p in packages {
        let wire = p.to_wire();
        let parsed: Package<Reading> = Package::parse(&wire).expect("well-formed wire text");
        assert_eq!(parsed.kind(), p.kind());
        assert_eq!(parsed.to_wire(), wire, "round trip changed {wire}");
    }
}

#[test]
fn test_record_decodes_from_parsed_body() {
    let original = Reading {
        sensor: "t3".into(),
        value: 12,
    };
    let wire = Package::data_item(original.clone()).to_wire();
    let parsed: Package<Reading> = Package::parse(&wire).unwrap();
    let decoded = Reading::from_wire(parsed.text().unwrap()).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_invalid_record_body_is_an_error_not_a_panic() {
    assert!(matches!(
        Reading::from_wire("{not json"),
        Err(ProtocolError::Json(_))
    ));
    assert!(matches!(
        Reading::parse_line("no tab here", "readings"),
        Err(ProtocolError::InvalidRecord(_))
    ));
}

#[test]
fn test_default_matches_uses_identity() {
    let a = Reading {
        sensor: "x".into(),
        value: 1,
    };
    let b = Reading {
        sensor: "x".into(),
        value: 2,
    };
    let c = Reading {
        sensor: "y".into(),
        value: 1,
    };
    assert!(a.matches(&b));
    assert!(!a.matches(&c));
}
