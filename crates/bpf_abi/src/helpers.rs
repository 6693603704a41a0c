pub const BPF_FUNC_MAP_LOOKUP_ELEM: u32 = 1;
pub const BPF_FUNC_MAP_UPDATE_ELEM: u32 = 2;
pub const BPF_FUNC_MAP_DELETE_ELEM: u32 = 3;
pub const BPF_FUNC_PROBE_READ: u32 = 4;
pub const BPF_FUNC_KTIME_GET_NS: u32 = 5;
pub const BPF_FUNC_TRACE_PRINTK: u32 = 6;
pub const BPF_FUNC_GET_PRANDOM_U32: u32 = 7;
pub const BPF_FUNC_GET_SMP_PROCESSOR_ID: u32 = 8;
pub const BPF_FUNC_SKB_STORE_BYTES: u32 = 9;
pub const BPF_FUNC_L3_CSUM_REPLACE: u32 = 10;
pub const BPF_FUNC_L4_CSUM_REPLACE: u32 = 11;
pub const BPF_FUNC_TAIL_CALL: u32 = 12;
pub const BPF_FUNC_CLONE_REDIRECT: u32 = 13;
pub const BPF_FUNC_GET_CURRENT_PID_TGID: u32 = 14;
pub const BPF_FUNC_GET_CURRENT_UID_GID: u32 = 15;
pub const BPF_FUNC_GET_CURRENT_COMM: u32 = 16;
pub const BPF_FUNC_GET_CGROUP_CLASSID: u32 = 17;
pub const BPF_FUNC_SKB_VLAN_PUSH: u32 = 18;
pub const BPF_FUNC_SKB_VLAN_POP: u32 = 19;
pub const BPF_FUNC_SKB_GET_TUNNEL_KEY: u32 = 20;
pub const BPF_FUNC_SKB_SET_TUNNEL_KEY: u32 = 21;
pub const BPF_FUNC_PERF_EVENT_READ: u32 = 22;
pub const BPF_FUNC_REDIRECT: u32 = 23;
pub const BPF_FUNC_GET_ROUTE_REALM: u32 = 24;
pub const BPF_FUNC_PERF_EVENT_OUTPUT: u32 = 25;
pub const BPF_FUNC_SKB_LOAD_BYTES: u32 = 26;
pub const BPF_FUNC_GET_STACKID: u32 = 27;
pub const BPF_FUNC_CSUM_DIFF: u32 = 28;
pub const BPF_FUNC_SKB_CHANGE_PROTO: u32 = 31;
pub const BPF_FUNC_SKB_CHANGE_TYPE: u32 = 32;
pub const BPF_FUNC_GET_HASH_RECALC: u32 = 34;
pub const BPF_FUNC_GET_CURRENT_TASK: u32 = 35;
pub const BPF_FUNC_PROBE_WRITE_USER: u32 = 36;
pub const BPF_FUNC_SKB_CHANGE_TAIL: u32 = 38;
pub const BPF_FUNC_SKB_PULL_DATA: u32 = 39;
pub const BPF_FUNC_GET_NUMA_NODE_ID: u32 = 42;
pub const BPF_FUNC_XDP_ADJUST_HEAD: u32 = 44;
pub const BPF_FUNC_PROBE_READ_STR: u32 = 45;
pub const BPF_FUNC_GET_SOCKET_COOKIE: u32 = 46;
pub const BPF_FUNC_SKB_ADJUST_ROOM: u32 = 50;
pub const BPF_FUNC_REDIRECT_MAP: u32 = 51;
pub const BPF_FUNC_FIB_LOOKUP: u32 = 69;
pub const BPF_FUNC_MAP_PUSH_ELEM: u32 = 87;
pub const BPF_FUNC_MAP_POP_ELEM: u32 = 88;
pub const BPF_FUNC_MAP_PEEK_ELEM: u32 = 89;
pub const BPF_FUNC_SPIN_LOCK: u32 = 93;
pub const BPF_FUNC_SPIN_UNLOCK: u32 = 94;
pub const BPF_FUNC_PROBE_READ_USER: u32 = 112;
pub const BPF_FUNC_PROBE_READ_KERNEL: u32 = 113;
pub const BPF_FUNC_PROBE_READ_USER_STR: u32 = 114;
pub const BPF_FUNC_PROBE_READ_KERNEL_STR: u32 = 115;
pub const BPF_FUNC_KTIME_GET_BOOT_NS: u32 = 125;
pub const BPF_FUNC_RINGBUF_OUTPUT: u32 = 130;
pub const BPF_FUNC_RINGBUF_RESERVE: u32 = 131;
pub const BPF_FUNC_RINGBUF_SUBMIT: u32 = 132;
pub const BPF_FUNC_RINGBUF_DISCARD: u32 = 133;
pub const BPF_FUNC_RINGBUF_QUERY: u32 = 134;

/// Helper names (without the `bpf_` prefix) and their ids for the kernel ABI
/// above.
pub const BPF_HELPERS: &[(&str, u32)] = &[
    ("map_lookup_elem", BPF_FUNC_MAP_LOOKUP_ELEM),
    ("map_update_elem", BPF_FUNC_MAP_UPDATE_ELEM),
    ("map_delete_elem", BPF_FUNC_MAP_DELETE_ELEM),
    ("probe_read", BPF_FUNC_PROBE_READ),
    ("ktime_get_ns", BPF_FUNC_KTIME_GET_NS),
    ("trace_printk", BPF_FUNC_TRACE_PRINTK),
    ("get_prandom_u32", BPF_FUNC_GET_PRANDOM_U32),
    ("get_smp_processor_id", BPF_FUNC_GET_SMP_PROCESSOR_ID),
    ("skb_store_bytes", BPF_FUNC_SKB_STORE_BYTES),
    ("l3_csum_replace", BPF_FUNC_L3_CSUM_REPLACE),
    ("l4_csum_replace", BPF_FUNC_L4_CSUM_REPLACE),
    ("tail_call", BPF_FUNC_TAIL_CALL),
    ("clone_redirect", BPF_FUNC_CLONE_REDIRECT),
    ("get_current_pid_tgid", BPF_FUNC_GET_CURRENT_PID_TGID),
    ("get_current_uid_gid", BPF_FUNC_GET_CURRENT_UID_GID),
    ("get_current_comm", BPF_FUNC_GET_CURRENT_COMM),
    ("get_cgroup_classid", BPF_FUNC_GET_CGROUP_CLASSID),
    ("skb_vlan_push", BPF_FUNC_SKB_VLAN_PUSH),
    ("skb_vlan_pop", BPF_FUNC_SKB_VLAN_POP),
    ("skb_get_tunnel_key", BPF_FUNC_SKB_GET_TUNNEL_KEY),
    ("skb_set_tunnel_key", BPF_FUNC_SKB_SET_TUNNEL_KEY),
    ("perf_event_read", BPF_FUNC_PERF_EVENT_READ),
    ("redirect", BPF_FUNC_REDIRECT),
    ("get_route_realm", BPF_FUNC_GET_ROUTE_REALM),
    ("perf_event_output", BPF_FUNC_PERF_EVENT_OUTPUT),
    ("skb_load_bytes", BPF_FUNC_SKB_LOAD_BYTES),
    ("get_stackid", BPF_FUNC_GET_STACKID),
    ("csum_diff", BPF_FUNC_CSUM_DIFF),
    ("skb_change_proto", BPF_FUNC_SKB_CHANGE_PROTO),
    ("skb_change_type", BPF_FUNC_SKB_CHANGE_TYPE),
    ("get_hash_recalc", BPF_FUNC_GET_HASH_RECALC),
    ("get_current_task", BPF_FUNC_GET_CURRENT_TASK),
    ("probe_write_user", BPF_FUNC_PROBE_WRITE_USER),
    ("skb_change_tail", BPF_FUNC_SKB_CHANGE_TAIL),
    ("skb_pull_data", BPF_FUNC_SKB_PULL_DATA),
    ("get_numa_node_id", BPF_FUNC_GET_NUMA_NODE_ID),
    ("xdp_adjust_head", BPF_FUNC_XDP_ADJUST_HEAD),
    ("probe_read_str", BPF_FUNC_PROBE_READ_STR),
    ("get_socket_cookie", BPF_FUNC_GET_SOCKET_COOKIE),
    ("skb_adjust_room", BPF_FUNC_SKB_ADJUST_ROOM),
    ("redirect_map", BPF_FUNC_REDIRECT_MAP),
    ("fib_lookup", BPF_FUNC_FIB_LOOKUP),
    ("map_push_elem", BPF_FUNC_MAP_PUSH_ELEM),
    ("map_pop_elem", BPF_FUNC_MAP_POP_ELEM),
    ("map_peek_elem", BPF_FUNC_MAP_PEEK_ELEM),
    ("spin_lock", BPF_FUNC_SPIN_LOCK),
    ("spin_unlock", BPF_FUNC_SPIN_UNLOCK),
    ("probe_read_user", BPF_FUNC_PROBE_READ_USER),
    ("probe_read_kernel", BPF_FUNC_PROBE_READ_KERNEL),
    ("probe_read_user_str", BPF_FUNC_PROBE_READ_USER_STR),
    ("probe_read_kernel_str", BPF_FUNC_PROBE_READ_KERNEL_STR),
    ("ktime_get_boot_ns", BPF_FUNC_KTIME_GET_BOOT_NS),
    ("ringbuf_output", BPF_FUNC_RINGBUF_OUTPUT),
    ("ringbuf_reserve", BPF_FUNC_RINGBUF_RESERVE),
    ("ringbuf_submit", BPF_FUNC_RINGBUF_SUBMIT),
    ("ringbuf_discard", BPF_FUNC_RINGBUF_DISCARD),
    ("ringbuf_query", BPF_FUNC_RINGBUF_QUERY),
];
