use super::*;

const LINUX_NETWORK: &str = "\
---
id: linux_network
name: Linux network recon
description: Checks listening ports and the hosts file
os_types: [linux]
tags: [network, recon]
severity_hint: medium
---
## check_listening_ports
description: List listening TCP/UDP sockets
command: ss -tlnpu
timeout: 10
requires_sudo: false

## check_hosts_file
description: Dump /etc/hosts
command: cat /etc/hosts
timeout: 5
";

#[test]
fn parses_front_matter_and_steps_in_order() {
    let module = parse_module(LINUX_NETWORK).unwrap();
    assert_eq!(module.id, "linux_network");
    assert_eq!(module.os_types, vec![AssetOs::Linux]);
    assert_eq!(module.steps.len(), 2);
    assert_eq!(module.steps[0].id, "check_listening_ports");
    assert_eq!(module.steps[0].command, "ss -tlnpu");
    assert_eq!(module.steps[0].timeout_secs, 10);
    assert_eq!(module.steps[1].id, "check_hosts_file");
    assert_eq!(module.steps[1].timeout_secs, 5);
    assert!(!module.steps[1].requires_sudo);
}

#[test]
fn missing_front_matter_delimiter_is_rejected() {
    assert!(parse_module("id: x\n").is_err());
}

#[test]
fn step_missing_command_is_rejected() {
    let bad = "\
---
id: x
name: X
description: x
os_types: [linux]
severity_hint: low
---
## only_step
description: no command here
";
    assert!(parse_module(bad).is_err());
}

#[test]
fn step_without_explicit_timeout_defaults_to_30() {
    let src = "\
---
id: x
name: X
description: x
os_types: [linux]
severity_hint: info
---
## s1
description: d
command: echo hi
";
    let module = parse_module(src).unwrap();
    assert_eq!(module.steps[0].timeout_secs, 30);
}
