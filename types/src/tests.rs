use super::*;
use commonware_codec::{DecodeExt, Encode};

fn item(id: i64, rarity: Rarity) -> Item {
    Item {
        id,
        name: format!("item-{id}"),
        rarity,
        spawn_percentage: 10,
        catch_percentage: 30,
        pull_weight: 5,
        max_item_spawned: 2,
    }
}

fn gacha_machine() -> GachaMachine {
    GachaMachine {
        id: 7,
        name: "Star Capsule".to_string(),
        price: 100,
        price_times_ten: 900,
        super_rare_pity: 10,
        ultra_rare_pity: 90,
        items: vec![
            MachineItem {
                id: 1,
                item: item(11, Rarity::Common),
            },
            MachineItem {
                id: 2,
                item: item(12, Rarity::SuperRare),
            },
            MachineItem {
                id: 3,
                item: item(13, Rarity::UltraRare),
            },
        ],
    }
}

#[test]
fn test_rarity_parses_wire_names() {
    for rarity in Rarity::ALL {
        assert_eq!(rarity.as_str().parse::<Rarity>().unwrap(), rarity);
    }
    assert_eq!(
        "legendary".parse::<Rarity>(),
        Err(item::UnknownRarity("legendary".to_string()))
    );
    assert_eq!(
        serde_json::to_string(&Rarity::UltraRare).unwrap(),
        "\"ultra_rare\""
    );
}

#[test]
fn test_gacha_machine_validation() {
    let machine = gacha_machine();
    assert_eq!(machine.validate(), Ok(()));
    assert_eq!(machine.price_for(1), Some(100));
    assert_eq!(machine.price_for(10), Some(900));
    assert_eq!(machine.price_for(3), None);
    assert_eq!(machine.items_of(Rarity::SuperRare).count(), 1);

    let mut inverted = gacha_machine();
    inverted.ultra_rare_pity = 5;
    assert!(matches!(
        inverted.validate(),
        Err(MachineConfigError::InvalidPity { .. })
    ));

    let mut weightless = gacha_machine();
    weightless.items[1].item.pull_weight = 0;
    assert_eq!(
        weightless.validate(),
        Err(MachineConfigError::NonPositivePullWeight {
            item_id: 12,
            weight: 0
        })
    );

    let mut empty = gacha_machine();
    empty.items.clear();
    assert_eq!(
        empty.validate(),
        Err(MachineConfigError::Empty { machine_id: 7 })
    );
}

#[test]
fn test_claw_machine_rejects_zero_catch_percentage() {
    let mut machine = ClawMachine {
        id: 3,
        name: "Plush Grabber".to_string(),
        price: 50,
        max_item: 4,
        items: vec![MachineItem {
            id: 1,
            item: item(21, Rarity::Rare),
        }],
    };
    assert_eq!(machine.validate(), Ok(()));

    machine.items[0].item.catch_percentage = 0;
    assert_eq!(
        machine.validate(),
        Err(MachineConfigError::ZeroCatchPercentage { item_id: 21 })
    );

    machine.items[0].item.catch_percentage = 10;
    machine.max_item = 0;
    assert!(matches!(
        machine.validate(),
        Err(MachineConfigError::InvalidMaxItem { .. })
    ));
}

#[test]
fn test_cache_keys() {
    assert_eq!(verdict_key(42), "game_results:42");
    assert_eq!(pity_key(7, 1001), "gacha:pity:7:1001");
}

#[test]
fn test_verdict_json_layout() {
    let verdicts = vec![
        Verdict {
            item_id: 1,
            name: "Bear".to_string(),
            success: true,
        },
        Verdict {
            item_id: 2,
            name: "Cat".to_string(),
            success: false,
        },
    ];
    let json = serde_json::to_string(&verdicts).unwrap();
    assert_eq!(
        json,
        r#"[{"itemID":1,"name":"Bear","success":true},{"itemID":2,"name":"Cat","success":false}]"#
    );
    let decoded: Vec<Verdict> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, verdicts);
}

#[test]
fn test_gacha_event_json_shape() {
    let event = GachaEvent {
        session: GachaPullSession {
            id: 0,
            gacha_machine_id: 7,
            player_id: 1001,
            pull_count: 10,
        },
        item_ids: vec![11, 12, 13],
    };
    let json = event.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "gacha_event");
    assert_eq!(value["session"]["gacha_machine_id"], 7);
    assert_eq!(value["session"]["pull_count"], 10);
    assert_eq!(value["item_ids"], serde_json::json!([11, 12, 13]));

    assert_eq!(GachaEvent::from_json(&json).unwrap(), event);
}

#[test]
fn test_gacha_event_rejects_foreign_messages() {
    assert!(matches!(
        GachaEvent::from_json(r#"{"type":"claw_event","item_ids":[1]}"#),
        Err(StreamMessageError::UnsupportedType(kind)) if kind == "claw_event"
    ));
    assert!(matches!(
        GachaEvent::from_json("not json"),
        Err(StreamMessageError::Malformed(_))
    ));
    assert!(matches!(
        GachaEvent::from_json(r#"{"type":"gacha_event","item_ids":[1]}"#),
        Err(StreamMessageError::Malformed(_))
    ));
    assert!(matches!(
        GachaEvent::from_json(
            r#"{"type":"gacha_event","session":{"id":0,"gacha_machine_id":1,"player_id":2,"pull_count":1},"item_ids":[]}"#
        ),
        Err(StreamMessageError::NoItems)
    ));
}

#[test]
fn test_account_json_is_flat() {
    let account = Account::new(5, "mole-hunter", 250);
    let value = serde_json::to_value(&account).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"id": 5, "username": "mole-hunter", "coin": 250, "diamond": 0})
    );
}

#[test]
fn test_start_claw_game_resp_layout() {
    let resp = StartClawGameResp {
        game_id: 42,
        results: vec![
            CatchResult {
                item_id: 1,
                catched: true,
            },
            CatchResult {
                item_id: 2,
                catched: false,
            },
        ],
    };
    let encoded = resp.encode();
    let mut expected = vec![0, 0, 0, 0, 0, 0, 0, 42, 2];
    expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1, 1]);
    expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 2, 0]);
    assert_eq!(encoded.as_ref(), expected.as_slice());

    let decoded = StartClawGameResp::decode(&mut encoded.as_ref()).unwrap();
    assert_eq!(decoded, resp);
}

#[test]
fn test_envelope_carries_tagged_payload() {
    let request = GetPullResultWsReq {
        player_id: 1001,
        machine_id: 7,
        pull_count: 10,
    };
    let envelope = Envelope::wrap(&request);
    assert_eq!(envelope.message_type, 7);
    assert_eq!(envelope.kind(), Ok(MessageType::GetPullResultWsReq));

    let wire = envelope.encode();
    let decoded = Envelope::decode(&mut wire.as_ref()).unwrap();
    assert_eq!(decoded.open::<GetPullResultWsReq>().unwrap(), request);
    assert!(decoded.open::<StartClawGameReq>().is_err());
}

#[test]
fn test_unknown_message_type() {
    let envelope = Envelope {
        message_type: 4242,
        payload: vec![],
    };
    assert_eq!(envelope.kind(), Err(UnknownMessageType(4242)));

    let reply = Envelope::unknown_message_type();
    assert_eq!(reply.kind(), Ok(MessageType::ErrorResp));
    assert_eq!(
        reply.open::<ErrorResp>().unwrap(),
        ErrorResp {
            code: 400,
            message: "Unknown message type".to_string()
        }
    );
}

#[test]
fn test_open_rejects_trailing_bytes() {
    let mut envelope = Envelope::wrap(&UpdateScoreReq {
        player_id: 9,
        score: 1200,
    });
    envelope.payload.push(0);
    assert!(envelope.open::<UpdateScoreReq>().is_err());
}

#[test]
fn test_empty_request_payloads() {
    let envelope = Envelope::wrap(&GetMoleWeightReq);
    assert!(envelope.payload.is_empty());
    assert_eq!(envelope.open::<GetMoleWeightReq>().unwrap(), GetMoleWeightReq);
}
