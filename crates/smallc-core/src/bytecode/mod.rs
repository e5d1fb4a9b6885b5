//! Bytecode : opcodes, tampon de code et désassembleur.
//!
//! Format : un unique tableau d'octets mêlant opcodes (1 octet) et opérandes
//! big-endian de 4 octets. Les sauts portent un offset relatif à la fin de
//! leur propre opérande.

/// Jeu d'opcodes et largeurs d'opérandes.
pub mod op;
/// Tampon d'émission (append + back-patch) et programme final.
pub mod code;
/// Décodage et désassemblage textuel.
pub mod disasm;
