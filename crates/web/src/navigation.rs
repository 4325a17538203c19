//! Role-based navigation menu.

use database::UserRole;
use serde::Serialize;

/// One entry of the navigation menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub key: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

const fn item(key: &'static str, label: &'static str, path: &'static str) -> NavItem {
    NavItem { key, label, path }
}

const MEMBER_ITEMS: &[NavItem] = &[
    item("dashboard", "Início", "/"),
    item("groups", "Grupos nos Lares", "/grupos"),
    item("prayer", "Pedidos de Oração", "/oracao"),
    item("announcements", "Avisos", "/avisos"),
    item("resources", "Recursos", "/recursos"),
    item("plans", "Planos", "/planos"),
];

const LEADER_ITEMS: &[NavItem] = &[
    item("discipleship", "Discipulado", "/discipulado"),
    item("alerts", "Alertas Pastorais", "/alertas"),
];

const PASTOR_ITEMS: &[NavItem] = &[item("members", "Membros", "/membros")];

const ADMIN_ITEMS: &[NavItem] = &[
    item("users", "Usuários", "/usuarios"),
    item("settings", "Configurações", "/configuracoes"),
];

/// Menu entries visible to a role, in display order.
pub fn navigation_for(role: UserRole) -> Vec<NavItem> {
    let mut items = MEMBER_ITEMS.to_vec();
    if role.is_leadership() {
        items.extend_from_slice(LEADER_ITEMS);
    }
    if role.is_pastoral() {
        items.extend_from_slice(PASTOR_ITEMS);
    }
    if role == UserRole::Admin {
        items.extend_from_slice(ADMIN_ITEMS);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(role: UserRole) -> Vec<&'static str> {
        navigation_for(role).iter().map(|i| i.key).collect()
    }

    #[test]
    fn test_member_menu() {
        assert_eq!(
            keys(UserRole::Membro),
            vec!["dashboard", "groups", "prayer", "announcements", "resources", "plans"]
        );
    }

    #[test]
    fn test_leadership_menus() {
        let lider = keys(UserRole::Lider);
        assert!(lider.contains(&"discipleship"));
        assert!(lider.contains(&"alerts"));
        assert!(!lider.contains(&"members"));
        assert_eq!(keys(UserRole::Missionario), lider);

        let pastor = keys(UserRole::Pastor);
        assert!(pastor.contains(&"members"));
        assert!(!pastor.contains(&"users"));
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = keys(UserRole::Admin);
        assert_eq!(admin.len(), 11);
        assert_eq!(admin.last(), Some(&"settings"));
    }
}
