//! Assembler Integration Tests
//!
//! These tests drive the whole pipeline through the public API:
//! - Encoding and decoding of assembled output
//! - Label resolution and jump displacements
//! - Map and helper binding
//! - Field-access relocations
//! - Size limits, configuration and the loader seam

use std::collections::BTreeMap;

use bpf_abi::{BPF_PSEUDO_MAP_FD, BpfProgType, LogLevel, ProgLoadFlags};
use bpf_asm::asm::*;
use bpf_asm::bytecode::MemSize;
use bpf_asm::bytecode::Register::*;
use bpf_asm::{
    AsmError, Assembler, AssemblerConfig, Environment, Fragment, Insn, InsnError, Item, LoadRejected,
    LoadRequest, Member, Program, ProgramLoader, RelocKind, SymbolKind, TypeGraph, assemble,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn env() -> Environment {
    Environment::new()
        .with_map("counter_map", 7)
        .with_map("events", 9)
}

/// Slot `n` of an assembled buffer.
fn slot(bytes: &[u8], n: usize) -> &[u8] {
    &bytes[n * 8..(n + 1) * 8]
}

fn imm_of(slot: &[u8]) -> i32 {
    i32::from_le_bytes([slot[4], slot[5], slot[6], slot[7]])
}

fn offset_of(slot: &[u8]) -> i16 {
    i16::from_le_bytes([slot[2], slot[3]])
}

fn kernel_types() -> TypeGraph {
    let mut types = TypeGraph::new();
    let int = types.add_int("int", 4);
    let u64_ty = types.add_int("u64", 8);
    let pid_t = types.add_typedef("pid_t", int);
    let comm = types.add_array(int, 4);
    types.add_struct(
        "task_struct",
        48,
        [
            Member::new("state", u64_ty, 0),
            Member::new("pid", pid_t, 8),
            Member::new("tgid", pid_t, 12),
            Member::new("comm", comm, 16),
        ],
    );
    types.add_enum("task_state", 4, [("RUNNING", 0), ("SLEEPING", 1)]);
    types
}

// ============================================================================
// Encoding Tests
// ============================================================================

mod encoding {
    use super::*;
    use proptest::prelude::*;

    /// Any instruction that passes validation: every opcode byte, registers
    /// r0-r10, a full 64-bit immediate only for the wide load.
    fn valid_insn() -> impl Strategy<Value = Insn> {
        (any::<u8>(), 0u8..=10, 0u8..=10, any::<i16>(), any::<i32>(), any::<i64>())
            .prop_map(|(opcode, dst, src, offset, imm32, imm64)| {
                let imm = if opcode == 0x18 { imm64 } else { i64::from(imm32) };
                Insn::new(opcode, dst, src, offset, imm)
            })
            .prop_filter("r10 is read-only", |insn| insn.validate().is_ok())
    }

    proptest! {
        #[test]
        fn any_valid_insn_round_trips(insn in valid_insn()) {
            let bytes = insn.encode().unwrap();
            prop_assert_eq!(bytes.len(), insn.slots() * 8);
            prop_assert_eq!(Insn::decode(&bytes), Ok((insn, bytes.len())));
        }

        #[test]
        fn any_valid_stream_round_trips(insns in prop::collection::vec(valid_insn(), 0..32)) {
            let mut bytes = Vec::new();
            for insn in &insns {
                insn.encode_into(&mut bytes).unwrap();
            }
            prop_assert_eq!(Insn::decode_all(&bytes).unwrap(), insns);
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let insns = [
            mov64_imm(R0, -1),
            mov32_reg(R1, R9),
            add64_imm(R2, 0x7fff_ffff),
            neg64(R3),
            be(R4, 64),
            ldx(MemSize::Half, R5, R10, -2),
            stx(MemSize::Word, R10, -4, R6),
            st_imm(MemSize::DWord, R10, -16, -7),
            atomic_fetch(bpf_asm::bytecode::AtomicOp::Xor, MemSize::Word, R7, 4, R8),
            cmpxchg(MemSize::DWord, R1, 0, R2),
            ld_imm64(R9, i64::MAX),
            call_id(14),
            exit(),
        ];

        for insn in insns {
            let bytes = insn.encode().unwrap();
            assert_eq!(Insn::decode(&bytes), Ok((insn, bytes.len())), "{insn}");
        }
    }

    #[test]
    fn assembled_bytes_decode_to_listing() {
        init();
        let program = Program::new("roundtrip")
            .item(mov64_imm(R6, 3))
            .item(ld_imm64(R1, -42))
            .item(label("loop"))
            .item(sub64_imm(R6, 1))
            .item(jne_imm(R6, 0, "loop"))
            .item(return_imm(0));

        let out = assemble(program, &Environment::new(), 64).unwrap();
        assert_eq!(out.instruction_count(), 7);
        assert_eq!(out.bytes().len(), 56);
        assert_eq!(Insn::decode_all(out.bytes()).unwrap(), out.instructions());
    }

    #[test]
    fn wide_immediate() {
        let program = Program::new("wide").item(ld_imm64(R1, 0x1_0000_0002));
        let out = assemble(program, &Environment::new(), 2).unwrap();

        let bytes = out.bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 0x18);
        assert_eq!(imm_of(slot(bytes, 0)), 2);
        assert_eq!(&slot(bytes, 1)[..4], &[0, 0, 0, 0]);
        assert_eq!(imm_of(slot(bytes, 1)), 1);
        assert_eq!(out.instruction_count(), 2);
    }

    #[test]
    fn register_nibbles() {
        let out = assemble(
            Program::new("regs").item(mov64_reg(R2, R7)),
            &Environment::new(),
            1,
        )
        .unwrap();
        // dst in the low nibble, src in the high nibble
        assert_eq!(out.bytes()[1], 0x72);
    }
}

// ============================================================================
// Label Resolution Tests
// ============================================================================

mod labels {
    use super::*;

    #[test]
    fn forward_jump_skips_two() {
        init();
        let program = Program::new("branch")
            .item(jeq_imm(R1, 0, "L"))
            .item(mov64_imm(R2, 1))
            .exit()
            .item(label("L"))
            .item(mov64_imm(R2, 2))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        assert_eq!(offset_of(slot(out.bytes(), 0)), 2);
        assert_eq!(out.label("L"), Some(3));
    }

    #[test]
    fn backward_jump() {
        let program = Program::new("loop")
            .item(mov64_imm(R1, 10))
            .item(label("top"))
            .item(sub64_imm(R1, 1))
            .item(jne_imm(R1, 0, "top"))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        assert_eq!(offset_of(slot(out.bytes(), 2)), -2);
    }

    #[test]
    fn wide_loads_count_two_slots() {
        let program = Program::new("wide_skip")
            .item(ja("end"))
            .item(ld_imm64(R0, 1 << 33))
            .item(label("end"))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        assert_eq!(offset_of(slot(out.bytes(), 0)), 2);
    }

    #[test]
    fn unresolved_label() {
        let program = Program::new("missing")
            .item(ja("missing"))
            .exit();

        let err = assemble(program, &Environment::new(), 16).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::Label,
                name: "missing".into(),
                slot: 0,
            }
        );
    }

    #[test]
    fn duplicate_label() {
        let program = Program::new("dup")
            .item(label("a"))
            .item(mov64_imm(R0, 0))
            .item(label("a"))
            .exit();

        let err = assemble(program, &Environment::new(), 16).unwrap_err();
        assert!(matches!(err, AsmError::DuplicateLabel { ref name, slot: 1 } if name == "a"));
    }

    #[test]
    fn short_jump_never_promoted() {
        let body: Vec<Insn> = (0..40_000).map(|_| mov64_imm(R0, 0)).collect();

        let short = Program::new("short")
            .item(ja("far"))
            .item(body.clone())
            .item(label("far"))
            .exit();
        let err = assemble(short, &Environment::new(), 100_000).unwrap_err();
        assert!(matches!(err, AsmError::JumpOffsetOutOfRange { offset: 40_000, .. }));

        let long = Program::new("long")
            .item(gotol("far"))
            .item(body)
            .item(label("far"))
            .exit();
        let out = assemble(long, &Environment::new(), 100_000).unwrap();
        assert_eq!(out.bytes()[0], 0x06);
        assert_eq!(imm_of(slot(out.bytes(), 0)), 40_000);
    }

    #[test]
    fn local_subprogram_call() {
        let program = Program::new("subprog")
            .item(call_local("double"))
            .exit()
            .item(label("double"))
            .item(mov64_reg(R0, R1))
            .item(add64_reg(R0, R1))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        let call = out.instructions()[0];
        assert!(call.is_pseudo_call());
        assert_eq!(call.imm, 1);
        assert_eq!(call.to_string(), "call pc+1");
    }

    #[test]
    fn nested_fragments_flatten_in_order() {
        let guard = seq([
            Fragment::from(jeq_imm(R1, 0, "out")),
            seq([mov64_imm(R0, 1), mov64_imm(R0, 2)]),
        ]);
        let program = Program::new("nested")
            .item(seq([guard, seq(Vec::<Fragment>::new())]))
            .item(label("out"))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        assert_eq!(out.instruction_count(), 4);
        assert_eq!(offset_of(slot(out.bytes(), 0)), 2);
    }
}

// ============================================================================
// Map and Helper Binding Tests
// ============================================================================

mod symbols {
    use super::*;

    #[test]
    fn map_binding() {
        let program = Program::new("map")
            .item(map_ref(R1, "counter_map"))
            .exit();

        let out = assemble(program, &env(), 16).unwrap();
        let first = slot(out.bytes(), 0);
        assert_eq!(first[0], 0x18);
        assert_eq!(first[1] & 0x0f, 1);
        assert_eq!(first[1] >> 4, BPF_PSEUDO_MAP_FD);
        assert_eq!(imm_of(first), 7);
        assert_eq!(imm_of(slot(out.bytes(), 1)), 0);
    }

    #[test]
    fn map_value_binding() {
        let program = Program::new("value")
            .item(map_value(R2, "events", 24))
            .exit();

        let out = assemble(program, &env(), 16).unwrap();
        assert_eq!(out.bytes()[1] >> 4, bpf_abi::BPF_PSEUDO_MAP_VALUE);
        assert_eq!(imm_of(slot(out.bytes(), 0)), 9);
        assert_eq!(imm_of(slot(out.bytes(), 1)), 24);
    }

    #[test]
    fn helper_binding() {
        let program = Program::new("helpers")
            .item(call("ktime_get_ns"))
            .item(call("bpf_get_current_pid_tgid"))
            .exit();

        let out = assemble(program, &env(), 16).unwrap();
        assert_eq!(out.bytes()[0], 0x85);
        assert_eq!(imm_of(slot(out.bytes(), 0)), 5);
        assert_eq!(imm_of(slot(out.bytes(), 1)), 14);
    }

    #[test]
    fn lookup_template() {
        let program = Program::new("lookup")
            .item(st_imm(MemSize::Word, R10, -4, 0))
            .item(map_lookup("counter_map", -4))
            .item(jeq_imm(R0, 0, "out"))
            .item(mov64_imm(R1, 1))
            .item(atomic_add64(R0, 0, R1))
            .item(label("out"))
            .item(return_imm(0));

        let out = assemble(program, &env(), 64).unwrap();
        assert_eq!(out.instruction_count(), 11);
        assert_eq!(offset_of(slot(out.bytes(), 6)), 2);
    }

    #[test]
    fn unbound_map() {
        let program = Program::new("unbound")
            .item(mov64_imm(R0, 0))
            .item(map_ref(R1, "nope"))
            .exit();

        let err = assemble(program, &env(), 16).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::MapHandle,
                name: "nope".into(),
                slot: 1,
            }
        );
        assert_eq!(err.to_string(), "unresolved map `nope` at instruction 1");
    }

    #[test]
    fn unknown_helper() {
        let program = Program::new("unknown").item(call("frobnicate")).exit();
        let err = assemble(program, &env(), 16).unwrap_err();
        assert!(matches!(
            err,
            AsmError::UnresolvedSymbol { kind: SymbolKind::Helper, ref name, slot: 0 } if name == "frobnicate"
        ));
    }

    #[test]
    fn labels_resolve_before_helpers() {
        let program = Program::new("two_errors")
            .item(call("no_such_helper"))
            .item(ja("missing"))
            .exit();

        assert_eq!(
            assemble(program, &env(), 16).unwrap_err(),
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::Label,
                name: "missing".into(),
                slot: 1,
            }
        );
    }

    #[test]
    fn maps_bind_before_field_accesses() {
        let program = Program::new("two_errors")
            .with_types(kernel_types())
            .item(field_offset(R1, "mm_struct", "pgd"))
            .item(map_ref(R2, "nope"))
            .exit();

        assert_eq!(
            assemble(program, &env(), 16).unwrap_err(),
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::MapHandle,
                name: "nope".into(),
                slot: 1,
            }
        );
    }

    #[test]
    fn same_program_different_maps() {
        let program = Program::new("rebind").item(map_ref(R1, "counter_map")).exit();

        let a = assemble(program.clone(), &env(), 16).unwrap();
        let b = assemble(program, &Environment::new().with_map("counter_map", 12), 16).unwrap();
        assert_eq!(imm_of(slot(a.bytes(), 0)), 7);
        assert_eq!(imm_of(slot(b.bytes(), 0)), 12);
    }
}

// ============================================================================
// Relocation Tests
// ============================================================================

mod relocations {
    use super::*;

    #[test]
    fn records_follow_placeholders() {
        init();
        let program = Program::new("core")
            .with_types(kernel_types())
            .item(mov64_reg(R6, R1))
            .item(field_load(MemSize::Word, R0, R6, "task_struct", "tgid"))
            .item(enum_value(R2, "task_state", "SLEEPING"))
            .item(field_exists(R3, "task_struct", "comm.2"))
            .item(type_size(R4, "task_struct"))
            .exit();

        let out = assemble(program, &Environment::new(), 64).unwrap();
        let relocs = out.relocations();
        assert_eq!(relocs.len(), 4);

        let slots: Vec<_> = relocs.iter().map(|r| r.insn_slot).collect();
        assert_eq!(slots, [1, 2, 4, 5]);

        assert_eq!(relocs[0].kind, RelocKind::FieldByteOffset);
        assert_eq!(relocs[0].access_spec, "0:2");
        assert_eq!(relocs[0].field_path, ["tgid"]);
        assert_eq!(offset_of(slot(out.bytes(), 1)), 0);

        assert_eq!(relocs[1].kind, RelocKind::EnumValue);
        assert_eq!(relocs[1].access_spec, "1");
        assert_eq!(out.bytes()[2 * 8], 0x18);

        assert_eq!(relocs[2].access_spec, "0:3:2");
        assert_eq!(imm_of(slot(out.bytes(), 4)), 1);

        assert_eq!(relocs[3].kind, RelocKind::TypeSize);
        assert_eq!(imm_of(slot(out.bytes(), 5)), 48);

        for reloc in relocs {
            assert!(out.type_graph().find(&reloc.type_name).is_some());
            assert_eq!(out.type_graph().find(&reloc.type_name), Some(reloc.type_id));
        }
    }

    #[test]
    fn offsets_account_for_labels_and_wide_loads() {
        let program = Program::new("core_after_wide")
            .with_types(kernel_types())
            .item(ld_imm64(R1, 0))
            .item(label("here"))
            .item(field_offset(R2, "task_struct", "pid"))
            .exit();

        let out = assemble(program, &Environment::new(), 16).unwrap();
        assert_eq!(out.relocations()[0].insn_slot, 2);
        assert_eq!(out.relocations()[0].insn_byte_offset(), 16);
    }

    #[test]
    fn unknown_reference_type() {
        let program = Program::new("bad_type")
            .with_types(kernel_types())
            .item(field_offset(R0, "mm_struct", "pgd"))
            .exit();

        let err = assemble(program, &Environment::new(), 16).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::ReferenceType,
                name: "mm_struct".into(),
                slot: 0,
            }
        );
    }

    #[test]
    fn unknown_reference_field() {
        let program = Program::new("bad_field")
            .with_types(kernel_types())
            .item(mov64_imm(R0, 0))
            .item(field_size(R0, "task_struct", "stats.flags"))
            .exit();

        let err = assemble(program, &Environment::new(), 16).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::ReferenceField,
                name: "task_struct.stats.flags".into(),
                slot: 1,
            }
        );
    }

    #[test]
    fn self_referential_array_is_unresolved() {
        let mut types = TypeGraph::new();
        types.add_array(1, 4);
        types.add_typedef("looped", 1);

        let program = Program::new("cycle")
            .with_types(types)
            .item(type_size(R0, "looped"))
            .exit();

        assert_eq!(
            assemble(program, &Environment::new(), 16).unwrap_err(),
            AsmError::UnresolvedSymbol {
                kind: SymbolKind::ReferenceType,
                name: "looped".into(),
                slot: 0,
            }
        );
    }

    #[test]
    fn no_type_graph_means_no_types() {
        let program = Program::new("untyped")
            .item(type_exists(R0, "task_struct"))
            .exit();
        assert!(matches!(
            assemble(program, &Environment::new(), 16),
            Err(AsmError::UnresolvedSymbol {
                kind: SymbolKind::ReferenceType,
                ..
            })
        ));
    }
}

// ============================================================================
// Limits and Structural Checks
// ============================================================================

mod limits {
    use super::*;

    fn straight_line(n: usize) -> Program {
        Program::new("straight")
            .items((1..n).map(|_| mov64_imm(R0, 0)))
            .exit()
    }

    #[test]
    fn size_ceiling() {
        let n = 32;
        assert!(assemble(straight_line(n), &Environment::new(), n).is_ok());
        assert_eq!(
            assemble(straight_line(n + 1), &Environment::new(), n).unwrap_err(),
            AsmError::SizeLimitExceeded {
                count: n + 1,
                limit: n,
            }
        );
    }

    #[test]
    fn ceiling_checked_before_lowering() {
        // The unbound helper would fail later; the size check wins.
        let program = Program::new("too_big")
            .item(call("frobnicate"))
            .item(ld_imm64(R0, 0))
            .exit();
        assert!(matches!(
            assemble(program, &Environment::new(), 3),
            Err(AsmError::SizeLimitExceeded { count: 4, limit: 3 })
        ));
    }

    #[test]
    fn invalid_register() {
        let program = Program::new("bad_reg")
            .item(mov64_imm(R0, 0))
            .item(Insn::alu(bpf_asm::bytecode::AluOp::Mov, true, 12, 0))
            .exit();
        assert_eq!(
            assemble(program, &Environment::new(), 16).unwrap_err(),
            AsmError::Structural {
                slot: 1,
                source: InsnError::InvalidRegister(12),
            }
        );
    }

    #[test]
    fn frame_pointer_is_not_a_destination() {
        let program = Program::new("fp").item(mov64_imm(R10, 0)).exit();
        assert!(matches!(
            assemble(program, &Environment::new(), 16),
            Err(AsmError::Structural {
                slot: 0,
                source: InsnError::FramePointerWrite,
            })
        ));

        // Stores through r10 are fine.
        let program = Program::new("fp_store")
            .item(stx(MemSize::DWord, R10, -8, R1))
            .exit();
        assert!(assemble(program, &Environment::new(), 16).is_ok());
    }

    #[test]
    fn jump_template_must_be_a_jump() {
        let program = Program::new("bad_jump")
            .item(Item::Jump {
                insn: mov64_imm(R0, 0),
                target: "x".into(),
            })
            .item(label("x"))
            .exit();
        assert!(matches!(
            assemble(program, &Environment::new(), 16),
            Err(AsmError::Structural {
                slot: 0,
                source: InsnError::NotAJump(0xb7),
            })
        ));
    }

    #[test]
    fn idempotent() {
        let program = Program::new("twice")
            .with_types(kernel_types())
            .item(map_lookup("counter_map", -8))
            .item(jeq_imm(R0, 0, "out"))
            .item(field_offset(R1, "task_struct", "pid"))
            .item(label("out"))
            .item(return_imm(0));

        let a = assemble(program.clone(), &env(), 64).unwrap();
        let b = assemble(program, &env(), 64).unwrap();
        assert_eq!(a.bytes(), b.bytes());
        assert_eq!(a, b);
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod config {
    use super::*;

    #[test]
    fn assembler_from_toml() {
        let config = AssemblerConfig::from_toml_str("max_instructions = 2\nrequire_exit = true").unwrap();
        let assembler = Assembler::new(config);

        let err = assembler
            .assemble(Program::new("big").item(return_imm(0)).exit(), &Environment::new())
            .unwrap_err();
        assert!(matches!(err, AsmError::SizeLimitExceeded { count: 3, limit: 2 }));

        let err = assembler
            .assemble(Program::new("open").item(mov64_imm(R0, 0)), &Environment::new())
            .unwrap_err();
        assert_eq!(err, AsmError::MissingExit { slot: 0 });
    }

    #[test]
    fn environment_from_toml() {
        let env = Environment::from_toml_str(
            r#"
            [maps]
            counter_map = 21

            [helpers]
            my_kfunc = 4242
            "#,
        )
        .unwrap();

        let program = Program::new("toml_env")
            .item(map_ref(R1, "counter_map"))
            .item(call("my_kfunc"))
            .item(call("map_lookup_elem"))
            .exit();
        let out = assemble(program, &env, 16).unwrap();
        assert_eq!(imm_of(slot(out.bytes(), 0)), 21);
        assert_eq!(imm_of(slot(out.bytes(), 2)), 4242);
        assert_eq!(imm_of(slot(out.bytes(), 3)), 1);
    }

    #[test]
    fn unprivileged_ceiling() {
        let assembler = Assembler::new(AssemblerConfig::unprivileged());
        let program = Program::new("big").items((0..4096).map(|_| mov64_imm(R0, 0))).exit();
        assert!(matches!(
            assembler.assemble(program, &Environment::new()),
            Err(AsmError::SizeLimitExceeded { count: 4097, limit: 4096 })
        ));
    }
}

// ============================================================================
// Loader Interface Tests
// ============================================================================

mod loader {
    use super::*;

    /// Loader that records attribute blocks and rejects unlicensed programs.
    #[derive(Default)]
    struct RecordingLoader {
        attrs: Vec<bpf_abi::BpfProgLoadAttr>,
        next_fd: i32,
    }

    impl ProgramLoader for RecordingLoader {
        type Error = LoadRejected;

        fn load(&mut self, request: &LoadRequest<'_>) -> Result<i32, LoadRejected> {
            if request.license_str().is_empty() {
                return Err(LoadRejected {
                    errno: 22,
                    log: "0: (b7) r0 = 0\nmissing license\n".into(),
                });
            }
            self.attrs.push(request.to_attr());
            self.next_fd += 1;
            Ok(self.next_fd)
        }
    }

    fn traced_program() -> bpf_asm::AssembledProgram {
        let program = Program::new("trace_task_pid_lookup")
            .with_types(kernel_types())
            .item(field_load(MemSize::Word, R0, R1, "task_struct", "pid"))
            .item(field_offset(R2, "task_struct", "tgid"))
            .exit();
        assemble(program, &Environment::new(), 16).unwrap()
    }

    #[test]
    fn attr_carries_program_shape() {
        let out = traced_program();
        let request = LoadRequest::new(&out, BpfProgType::Kprobe)
            .flags(ProgLoadFlags::STRICT_ALIGNMENT)
            .log(LogLevel::LEVEL1 | LogLevel::STATS, 4096);
        let attr = request.to_attr();

        assert_eq!(attr.prog_type, 2);
        assert_eq!(attr.insn_cnt, 3);
        assert_eq!(attr.prog_flags, 1);
        assert_eq!(attr.log_level, 5);
        assert_eq!(attr.log_size, 4096);
        assert_eq!(attr.core_relo_cnt, 2);
        assert_eq!(attr.core_relo_rec_size, 16);
        assert_eq!(&attr.prog_name[..15], b"trace_task_pid_");
        assert_eq!(attr.insns, 0);
        assert_eq!(request.insns_len(), 24);
    }

    #[test]
    fn raw_relocations_intern_access_strings() {
        let out = traced_program();
        let request = LoadRequest::new(&out, BpfProgType::Kprobe);

        let mut strings = String::from("\0");
        let raw = request.raw_relocations(|s| {
            let off = strings.len() as u32;
            strings.push_str(s);
            strings.push('\0');
            off
        })
        .unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].insn_off, 0);
        assert_eq!(raw[1].insn_off, 8);
        assert_eq!(raw[0].access_str_off, 1);
        assert_eq!(raw[1].access_str_off, 5);
        assert_eq!(strings, "\00:1\00:2\0");
        assert_eq!(raw[0].kind, bpf_abi::BPF_CORE_FIELD_BYTE_OFFSET);
    }

    #[test]
    fn rejection_keeps_verifier_log() {
        let out = traced_program();
        let mut loader = RecordingLoader::default();

        let fd = loader
            .load(&LoadRequest::new(&out, BpfProgType::Kprobe))
            .unwrap();
        assert_eq!(fd, 1);
        assert_eq!(loader.attrs.len(), 1);

        let err = loader
            .load(&LoadRequest::new(&out, BpfProgType::Kprobe).license(""))
            .unwrap_err();
        assert_eq!(err.log, "0: (b7) r0 = 0\nmissing license\n");
        assert_eq!(err.to_string(), "program rejected by the kernel (errno 22)");
    }

    #[test]
    fn environment_from_registry() {
        let mut registry = BTreeMap::new();
        registry.insert("counter_map".to_string(), 33);
        registry.insert("events".to_string(), 34);

        let env = Environment::from_registry(&registry);
        assert_eq!(env.map_fd("counter_map"), Some(33));
        assert_eq!(env.map_fd("events"), Some(34));
        assert_eq!(env.helper_id("ringbuf_output"), Some(130));
    }
}
