use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub client_name: String,
    pub client_whatsapp: String,
    pub project_type: Option<ProjectType>,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: ProjectStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

/// Project lifecycle. ACTIVE to FINISHED is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "FINISHED")]
    Finished,
}

impl ProjectStatus {
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        matches!((self, next), (ProjectStatus::Active, ProjectStatus::Finished))
    }
}

/// Catalogue of project offerings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[sea_orm(string_value = "fastpage")]
    Fastpage,
    #[sea_orm(string_value = "mini_ecommerce")]
    MiniEcommerce,
    #[sea_orm(string_value = "ecommerce_full")]
    EcommerceFull,
    #[sea_orm(string_value = "seo_basico")]
    SeoBasico,
    #[sea_orm(string_value = "web_corporativa")]
    WebCorporativa,
    #[sea_orm(string_value = "landing_focus")]
    LandingFocus,
    /// Custom work; requires a description.
    #[sea_orm(string_value = "a_medida")]
    AMedida,
}

impl ProjectType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fastpage" => Some(Self::Fastpage),
            "mini_ecommerce" => Some(Self::MiniEcommerce),
            "ecommerce_full" => Some(Self::EcommerceFull),
            "seo_basico" => Some(Self::SeoBasico),
            "web_corporativa" => Some(Self::WebCorporativa),
            "landing_focus" => Some(Self::LandingFocus),
            "a_medida" => Some(Self::AMedida),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Fastpage => "fastpage",
            Self::MiniEcommerce => "mini_ecommerce",
            Self::EcommerceFull => "ecommerce_full",
            Self::SeoBasico => "seo_basico",
            Self::WebCorporativa => "web_corporativa",
            Self::LandingFocus => "landing_focus",
            Self::AMedida => "a_medida",
        }
    }

    /// Human label shown on cards.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fastpage => "Fastpage",
            Self::MiniEcommerce => "Mini Ecommerce",
            Self::EcommerceFull => "Ecommerce Full",
            Self::SeoBasico => "SEO Basico",
            Self::WebCorporativa => "Web corporativa pre diseñada",
            Self::LandingFocus => "Landing focus",
            Self::AMedida => "Proyecto a medida",
        }
    }

    pub fn requires_description(self) -> bool {
        self == Self::AMedida
    }
}
