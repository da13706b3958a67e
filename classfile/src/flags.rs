macro_rules! access_flags {
    ($name:ident { $($flag:ident = $value:expr => $check:ident),* $(,)? }) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u16);

        impl $name {
            $(pub const $flag: u16 = $value;)*

            pub const fn new(raw: u16) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u16 {
                self.0
            }

            pub const fn get_raw_i32(self) -> i32 {
                self.0 as i32
            }

            pub const fn contains(self, mask: u16) -> bool {
                self.0 & mask == mask
            }

            pub const fn with(self, mask: u16) -> Self {
                Self(self.0 | mask)
            }

            pub const fn without(self, mask: u16) -> Self {
                Self(self.0 & !mask)
            }

            $(pub const fn $check(self) -> bool {
                self.0 & $value != 0
            })*
        }

        impl From<u16> for $name {
            fn from(value: u16) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(0x{:04x})", stringify!($name), self.0)
            }
        }
    };
}

access_flags!(ClassFlags {
    ACC_PUBLIC = 0x0001 => is_public,
    ACC_FINAL = 0x0010 => is_final,
    ACC_SUPER = 0x0020 => is_super,
    ACC_INTERFACE = 0x0200 => is_interface,
    ACC_ABSTRACT = 0x0400 => is_abstract,
    ACC_SYNTHETIC = 0x1000 => is_synthetic,
    ACC_ANNOTATION = 0x2000 => is_annotation,
    ACC_ENUM = 0x4000 => is_enum,
    ACC_MODULE = 0x8000 => is_module,
});

access_flags!(FieldFlags {
    ACC_PUBLIC = 0x0001 => is_public,
    ACC_PRIVATE = 0x0002 => is_private,
    ACC_PROTECTED = 0x0004 => is_protected,
    ACC_STATIC = 0x0008 => is_static,
    ACC_FINAL = 0x0010 => is_final,
    ACC_VOLATILE = 0x0040 => is_volatile,
    ACC_TRANSIENT = 0x0080 => is_transient,
    ACC_SYNTHETIC = 0x1000 => is_synthetic,
    ACC_ENUM = 0x4000 => is_enum,
});

access_flags!(MethodFlags {
    ACC_PUBLIC = 0x0001 => is_public,
    ACC_PRIVATE = 0x0002 => is_private,
    ACC_PROTECTED = 0x0004 => is_protected,
    ACC_STATIC = 0x0008 => is_static,
    ACC_FINAL = 0x0010 => is_final,
    ACC_SYNCHRONIZED = 0x0020 => is_synchronized,
    ACC_BRIDGE = 0x0040 => is_bridge,
    ACC_VARARGS = 0x0080 => is_varargs,
    ACC_NATIVE = 0x0100 => is_native,
    ACC_ABSTRACT = 0x0400 => is_abstract,
    ACC_STRICT = 0x0800 => is_strict,
    ACC_SYNTHETIC = 0x1000 => is_synthetic,
});

impl FieldFlags {
    /// True when the two flag sets differ in nothing but `ACC_STATIC`.
    pub const fn differs_only_in_static(self, other: FieldFlags) -> bool {
        self.0 != other.0 && (self.0 | Self::ACC_STATIC) == (other.0 | Self::ACC_STATIC)
    }
}
