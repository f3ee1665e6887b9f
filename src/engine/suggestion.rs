// ==========================================
// 印刷经纪订单管理系统 - 工序建议引擎
// ==========================================
// 依据: 工序建议与校验设计 v0.1 - 固定规则序列
// 红线: 纯函数, 无 I/O 无随机性; 相同输入必须产出
//       相同且同序的输出
// ==========================================
// 职责: 根据工单分类推导默认生产工序集
// 输入: JobClassification
// 输出: 有序 SuggestedComponent 列表 (sort_order 递增)
// ==========================================

use crate::domain::component::{component_defaults, JobClassification, SuggestedComponent};
use crate::domain::types::{ComponentType, JobMetaType, JobType, MailFormat};
use tracing::instrument;

// ==========================================
// ComponentSuggestionEngine - 工序建议引擎
// ==========================================
pub struct ComponentSuggestionEngine;

impl ComponentSuggestionEngine {
    /// 创建新的工序建议引擎
    pub fn new() -> Self {
        Self
    }

    /// 推导建议工序集
    ///
    /// 规则按固定顺序执行, 每条命中即向结果追加一个工序:
    /// 1) 总是首先产出 PRINT
    /// 2) 邮寄类产出 DATA (名单处理/认证); 否则 has_data 时产出通用 DATA
    /// 3) 信封形式产出 FINISHING (装封 envelope_components 件, 默认1)
    /// 4) 非邮寄工单: 折页产出 BINDERY (折页); 手册类产出 BINDERY (装订),
    ///    说明区分自封面与独立封面
    /// 5) 总是产出 PROOF
    /// 6) 邮寄类产出 MAILING (邮政处理/直投)
    /// 7) has_samples 时产出 SAMPLES
    /// 8) 总是最后产出 SHIPPING, 说明按元类型区分 (邮局交付/客户交付)
    #[instrument(skip(self, classification), fields(meta_type = %classification.meta_type))]
    pub fn suggest(&self, classification: &JobClassification) -> Vec<SuggestedComponent> {
        let mut result: Vec<SuggestedComponent> = Vec::new();

        // 规则1: PRINT
        Self::push(
            &mut result,
            ComponentType::Print,
            "Print",
            "Print production".to_string(),
        );

        // 规则2: DATA
        if classification.meta_type == JobMetaType::Mailing {
            Self::push(
                &mut result,
                ComponentType::Data,
                "Data Processing",
                "List processing and certification".to_string(),
            );
        } else if classification.has_data {
            Self::push(
                &mut result,
                ComponentType::Data,
                "Data Processing",
                "Data file processing".to_string(),
            );
        }

        // 规则3: FINISHING (信封装封)
        if classification.mail_format == Some(MailFormat::Envelope) {
            let count = if classification.envelope_components > 0 {
                classification.envelope_components
            } else {
                1 // 默认装封1件
            };
            Self::push(
                &mut result,
                ComponentType::Finishing,
                "Inserting",
                format!("Insert {} components into envelope", count),
            );
        }

        // 规则4: BINDERY (仅非邮寄工单)
        if classification.meta_type == JobMetaType::Job {
            match classification.job_type {
                Some(JobType::Folded) => {
                    Self::push(
                        &mut result,
                        ComponentType::Bindery,
                        "Folding",
                        "Fold to finished size".to_string(),
                    );
                }
                Some(JobType::BookletSelfCover) => {
                    Self::push(
                        &mut result,
                        ComponentType::Bindery,
                        "Bindery",
                        "Saddle stitch self cover".to_string(),
                    );
                }
                Some(JobType::BookletPlusCover) => {
                    Self::push(
                        &mut result,
                        ComponentType::Bindery,
                        "Bindery",
                        "Saddle stitch with separate cover".to_string(),
                    );
                }
                Some(JobType::Flat) | None => {}
            }
        }

        // 规则5: PROOF
        Self::push(
            &mut result,
            ComponentType::Proof,
            "Proof",
            "Contract proof approval".to_string(),
        );

        // 规则6: MAILING
        if classification.meta_type == JobMetaType::Mailing {
            Self::push(
                &mut result,
                ComponentType::Mailing,
                "Mail Processing",
                "Postal processing and drop ship".to_string(),
            );
        }

        // 规则7: SAMPLES
        if classification.has_samples {
            Self::push(
                &mut result,
                ComponentType::Samples,
                "Samples",
                "Pull and ship samples".to_string(),
            );
        }

        // 规则8: SHIPPING (总是最后)
        let shipping_desc = match classification.meta_type {
            JobMetaType::Mailing => "Deliver to mail facility",
            JobMetaType::Job => "Ship to customer",
        };
        Self::push(
            &mut result,
            ComponentType::Shipping,
            "Shipping",
            shipping_desc.to_string(),
        );

        result
    }

    /// 追加建议工序, sort_order 递增, 默认属性按类型查表
    fn push(result: &mut Vec<SuggestedComponent>, component_type: ComponentType, name: &str, description: String) {
        let defaults = component_defaults(component_type);
        let sort_order = (result.len() as i32 + 1) * 10;

        result.push(SuggestedComponent {
            component_type,
            name: name.to_string(),
            description,
            owner: defaults.owner,
            artwork_required: defaults.artwork_required,
            data_required: defaults.data_required,
            sort_order,
        });
    }
}

impl Default for ComponentSuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ComponentOwner;

    fn types_of(list: &[SuggestedComponent]) -> Vec<ComponentType> {
        list.iter().map(|c| c.component_type).collect()
    }

    #[test]
    fn test_envelope_mailing_sequence() {
        let engine = ComponentSuggestionEngine::new();
        let mut classification = JobClassification::mailing(MailFormat::Envelope);
        classification.envelope_components = 3;

        let result = engine.suggest(&classification);

        assert_eq!(
            types_of(&result),
            vec![
                ComponentType::Print,
                ComponentType::Data,
                ComponentType::Finishing,
                ComponentType::Proof,
                ComponentType::Mailing,
                ComponentType::Shipping,
            ]
        );
        assert_eq!(result[2].description, "Insert 3 components into envelope");
        assert_eq!(result[5].description, "Deliver to mail facility");
    }

    #[test]
    fn test_booklet_plus_cover_sequence() {
        let engine = ComponentSuggestionEngine::new();
        let classification = JobClassification::job(JobType::BookletPlusCover);

        let result = engine.suggest(&classification);

        // BINDERY 在固定序列中先于 PROOF 产出
        assert_eq!(
            types_of(&result),
            vec![
                ComponentType::Print,
                ComponentType::Bindery,
                ComponentType::Proof,
                ComponentType::Shipping,
            ]
        );
        assert_eq!(result[1].description, "Saddle stitch with separate cover");
        assert_eq!(result[3].description, "Ship to customer");
    }

    #[test]
    fn test_deterministic_output() {
        let engine = ComponentSuggestionEngine::new();
        let mut classification = JobClassification::mailing(MailFormat::SelfMailer);
        classification.has_samples = true;

        let first = engine.suggest(&classification);
        let second = engine.suggest(&classification);

        assert_eq!(first, second);
    }

    #[test]
    fn test_sort_order_strictly_increasing() {
        let engine = ComponentSuggestionEngine::new();
        let mut classification = JobClassification::job(JobType::Folded);
        classification.has_data = true;
        classification.has_samples = true;

        let result = engine.suggest(&classification);

        for pair in result.windows(2) {
            assert!(pair[0].sort_order < pair[1].sort_order);
        }
    }

    #[test]
    fn test_defaults_applied_per_type() {
        let engine = ComponentSuggestionEngine::new();
        let result = engine.suggest(&JobClassification::mailing(MailFormat::Envelope));

        for c in &result {
            assert_eq!(c.owner, ComponentOwner::Internal);
            match c.component_type {
                ComponentType::Print | ComponentType::Proof => assert!(c.artwork_required),
                ComponentType::Data | ComponentType::Mailing => assert!(c.data_required),
                _ => {
                    assert!(!c.artwork_required);
                    assert!(!c.data_required);
                }
            }
        }
    }
}
