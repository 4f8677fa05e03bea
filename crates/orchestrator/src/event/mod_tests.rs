use super::*;

#[test]
fn room_round_trips_through_string() {
    assert_eq!(Room::session("abc").to_string(), "session:abc");
    assert_eq!(Room::asset("xyz").to_string(), "asset:xyz");
    assert_eq!(Room::Global.to_string(), "global");

    assert_eq!(Room::try_from("session:abc".to_string()).unwrap(), Room::session("abc"));
    assert_eq!(Room::try_from("asset:xyz".to_string()).unwrap(), Room::asset("xyz"));
    assert_eq!(Room::try_from("global".to_string()).unwrap(), Room::Global);
}

#[test]
fn rejects_unknown_room_prefix() {
    assert!(Room::try_from("nope:1".to_string()).is_err());
}
