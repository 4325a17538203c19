//! Fixed vocabularies persisted as lowercase text.
//!
//! The stored text is the exact serde/sqlx representation, so parsing is
//! case-sensitive: `"Pastor"` is not a role, `"pastor"` is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(rename_all = "snake_case")]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored text for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ValidationError::UnknownValue {
                        field: $field.to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Role of a person within a church.
    UserRole, "user_role" {
        Admin => "admin",
        Pastor => "pastor",
        Missionario => "missionario",
        Lider => "lider",
        Membro => "membro",
    }
}

impl UserRole {
    /// Rank used to pick the primary role among several assignments.
    pub fn rank(&self) -> u8 {
        match self {
            UserRole::Admin => 4,
            UserRole::Pastor => 3,
            UserRole::Missionario => 2,
            UserRole::Lider => 1,
            UserRole::Membro => 0,
        }
    }

    /// Admins and pastors: full pastoral visibility.
    pub fn is_pastoral(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Pastor)
    }

    /// Anyone who leads people: pastoral roles, missionaries and leaders.
    pub fn is_leadership(&self) -> bool {
        !matches!(self, UserRole::Membro)
    }
}

text_enum! {
    /// Kind of pastoral alert produced by the generator.
    AlertType, "alert_type" {
        DiscipuloAusente => "discipulo_ausente",
        NovoConvertido => "novo_convertido",
        GrupoSobrecarregado => "grupo_sobrecarregado",
        EncontroAtrasado => "encontro_atrasado",
    }
}

text_enum! {
    /// Alert priority.
    AlertPriority, "priority" {
        Baixa => "baixa",
        Media => "media",
        Alta => "alta",
    }
}

text_enum! {
    /// Status of a user's progress through a plan.
    ProgressStatus, "status" {
        NaoIniciado => "nao_iniciado",
        EmProgresso => "em_progresso",
        Concluido => "concluido",
        Arquivado => "arquivado",
        Removido => "removido",
    }
}

impl ProgressStatus {
    /// Archived and removed progress is frozen.
    pub fn is_closed(&self) -> bool {
        matches!(self, ProgressStatus::Arquivado | ProgressStatus::Removido)
    }
}

text_enum! {
    /// Discipleship activity assigned to a disciple.
    ActivityType, "activity_type" {
        Oracao => "oracao",
        Jejum => "jejum",
        Meta => "meta",
        Tarefa => "tarefa",
        LeituraBiblica => "leitura_biblica",
    }
}
