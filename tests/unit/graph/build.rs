use super::*;

use crate::graph::node::{BlendMode, MorphologyOp, NoiseKind};

fn red() -> Rgba8 {
    Rgba8::new(255, 0, 0, 255)
}

#[test]
fn unset_inputs_chain_to_the_previous_node() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::blur(1.0))
        .node(NodeDesc::morphology(MorphologyOp::Erode, 1.0))
        .build()
        .unwrap();
    let nodes = graph.nodes();
    assert_eq!(nodes[0].primary(), SourceSelector::SourceGraphic);
    assert_eq!(nodes[1].primary(), SourceSelector::Reference(NodeId(0)));
    assert_eq!(nodes[0].usage(), 1);
    assert_eq!(nodes[1].usage(), 0);
}

#[test]
fn generators_read_nothing() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::blur(1.0))
        .node(NodeDesc::flood(red(), 1.0))
        .build()
        .unwrap();
    assert_eq!(graph.nodes()[1].primary(), SourceSelector::None);
    assert_eq!(graph.nodes()[0].usage(), 0);
}

#[test]
fn later_names_shadow_earlier_ones() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::flood(red(), 1.0).result("a"))
        .node(NodeDesc::blur(1.0).input(Input::SourceGraphic).result("a"))
        .node(NodeDesc::blur(2.0).input(Input::result("a")))
        .build()
        .unwrap();
    assert_eq!(
        graph.nodes()[2].primary(),
        SourceSelector::Reference(NodeId(1))
    );
    assert_eq!(graph.find("a"), Some(NodeId(1)));
    assert_eq!(graph.find_by_hash(name_hash("a")), Some(NodeId(1)));
    assert_eq!(graph.nodes()[0].id(), name_hash("a"));
}

#[test]
fn forward_references_are_rejected() {
    let err = FilterGraph::builder()
        .node(NodeDesc::blur(1.0).input(Input::result("later")))
        .node(NodeDesc::flood(red(), 1.0).result("later"))
        .build()
        .unwrap_err();
    assert!(matches!(err, FilterError::Config(_)));
    assert!(err.to_string().contains("node #0"), "{err}");
    assert!(err.to_string().contains("later"), "{err}");
}

#[test]
fn color_matrix_requires_an_explicit_input() {
    let err = FilterGraph::builder()
        .node(NodeDesc::color_matrix(ColorMatrixKind::Saturate, Some(0.5)).result("cm"))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("node 'cm'"), "{err}");

    let ok = FilterGraph::builder()
        .node(
            NodeDesc::color_matrix(ColorMatrixKind::Saturate, Some(0.5))
                .input(Input::SourceGraphic),
        )
        .build();
    assert!(ok.is_ok());
}

#[test]
fn composite_without_mix_is_a_configuration_error() {
    let err = FilterGraph::builder()
        .node(NodeDesc::composite(CompositeOperator::Over))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("mix"), "{err}");

    let err = FilterGraph::builder()
        .node(NodeDesc::blend(BlendMode::Multiply))
        .build()
        .unwrap_err();
    assert!(matches!(err, FilterError::Config(_)));
}

#[test]
fn convolution_kernel_size_must_match_order() {
    let err = FilterGraph::builder()
        .node(NodeDesc::convolve(3, vec![1.0; 8]))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("expected 9"), "{err}");
}

#[test]
fn convolution_divisor_defaults_to_kernel_sum() {
    let effect = build_effect(&NodeDesc::convolve(3, vec![1.0; 9]).effect).unwrap();
    let Effect::Convolve(p) = effect else {
        panic!("expected convolve");
    };
    assert_eq!(p.divisor, 9.0);
    assert_eq!((p.target_x, p.target_y), (1, 1));

    let zero_sum = vec![-1.0, 0.0, 1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0];
    let Effect::Convolve(p) = build_effect(&NodeDesc::convolve(3, zero_sum).effect).unwrap() else {
        panic!("expected convolve");
    };
    assert_eq!(p.divisor, 1.0);
}

#[test]
fn explicit_zero_divisor_and_out_of_range_target_are_rejected() {
    let mut desc = NodeDesc::convolve(3, vec![1.0; 9]);
    if let EffectDesc::Convolve { divisor, .. } = &mut desc.effect {
        *divisor = Some(0.0);
    }
    assert!(build_effect(&desc.effect).is_err());

    let mut desc = NodeDesc::convolve(3, vec![1.0; 9]);
    if let EffectDesc::Convolve { target_x, .. } = &mut desc.effect {
        *target_x = Some(3);
    }
    let err = build_effect(&desc.effect).unwrap_err();
    assert!(err.to_string().contains("target"), "{err}");
}

#[test]
fn negative_radius_and_deviation_are_rejected() {
    assert!(build_effect(&NodeDesc::blur(-1.0).effect).is_err());
    assert!(build_effect(&NodeDesc::morphology(MorphologyOp::Dilate, -2.0).effect).is_err());
    assert!(build_effect(&NodeDesc::blur(f64::NAN).effect).is_err());
}

#[test]
fn custom_color_matrix_needs_twenty_values() {
    let err = build_effect(&NodeDesc::color_matrix_values(vec![0.0; 19]).effect).unwrap_err();
    assert!(err.to_string().contains("got 19"), "{err}");

    let mut values = vec![0.0; 20];
    values[0] = 1.0;
    let Effect::ColorMatrix(ColorMatrixMode::Matrix(m)) =
        build_effect(&NodeDesc::color_matrix_values(values).effect).unwrap()
    else {
        panic!("expected matrix");
    };
    assert_eq!(m[0], 1.0);
}

#[test]
fn turbulence_seed_is_rounded() {
    let Effect::Turbulence(p) =
        build_effect(&NodeDesc::turbulence(0.1, 2, 4.6, NoiseKind::FractalNoise).effect).unwrap()
    else {
        panic!("expected turbulence");
    };
    assert_eq!(p.seed, 5);
    assert_eq!(p.octaves, 2);
    assert_eq!(p.base_freq_y, 0.1);
}

#[test]
fn lenient_build_drops_invalid_nodes() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::flood(red(), 1.0).result("ok"))
        .node(NodeDesc::convolve(2, vec![1.0; 3]).result("bad"))
        .node(NodeDesc::blur(1.0).input(Input::result("bad")))
        .build_lenient()
        .unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.dropped().len(), 1);
    assert_eq!(graph.dropped()[0].index, 1);
    assert_eq!(graph.dropped()[0].name, "bad");
    assert!(graph.nodes()[1].is_dropped());
    // The dangling reference still resolves to the dropped slot.
    assert_eq!(
        graph.nodes()[2].primary(),
        SourceSelector::Reference(NodeId(1))
    );
    assert_eq!(graph.nodes()[1].usage(), 1);
}

#[test]
fn single_consumer_offset_is_folded() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::offset(3.0, 4.0).input(Input::SourceGraphic))
        .node(NodeDesc::blur(1.0))
        .build()
        .unwrap();
    let nodes = graph.nodes();
    assert!(nodes[0].is_folded());
    assert_eq!(nodes[1].primary(), SourceSelector::SourceGraphic);
    assert_eq!(nodes[1].source_offset(), Some(Vec2::new(3.0, 4.0)));
    assert_eq!(nodes[0].usage(), 0);
}

#[test]
fn chained_offsets_accumulate() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::offset(1.0, 0.0).input(Input::SourceGraphic))
        .node(NodeDesc::offset(2.0, 5.0))
        .node(NodeDesc::blur(0.0))
        .build()
        .unwrap();
    let nodes = graph.nodes();
    assert!(nodes[0].is_folded());
    assert!(nodes[1].is_folded());
    assert_eq!(nodes[2].primary(), SourceSelector::SourceGraphic);
    assert_eq!(nodes[2].source_offset(), Some(Vec2::new(3.0, 5.0)));
}

#[test]
fn shared_or_secondary_offsets_stay_in_place() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::offset(3.0, 0.0).input(Input::SourceGraphic).result("o"))
        .node(NodeDesc::blur(1.0).input(Input::result("o")))
        .node(NodeDesc::blur(2.0).input(Input::result("o")))
        .build()
        .unwrap();
    assert!(!graph.nodes()[0].is_folded());
    assert_eq!(graph.nodes()[0].usage(), 2);

    let graph = FilterGraph::builder()
        .node(NodeDesc::offset(3.0, 0.0).input(Input::SourceGraphic).result("o"))
        .node(
            NodeDesc::composite(CompositeOperator::Over)
                .input(Input::SourceGraphic)
                .mix(Input::result("o")),
        )
        .build()
        .unwrap();
    assert!(!graph.nodes()[0].is_folded());
}

#[test]
fn offsets_read_twice_by_one_consumer_stay_in_place() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::offset(2.0, 2.0).input(Input::SourceGraphic).result("o"))
        .node(
            NodeDesc::composite(CompositeOperator::Over)
                .input(Input::result("o"))
                .mix(Input::result("o")),
        )
        .build()
        .unwrap();
    assert!(!graph.nodes()[0].is_folded());
    assert_eq!(graph.nodes()[0].usage(), 2);
    assert_eq!(graph.nodes()[1].source_offset(), None);
}

#[test]
fn merge_resolves_every_input() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::flood(red(), 1.0).result("f"))
        .node(NodeDesc::merge(vec![Input::result("f"), Input::SourceGraphic]))
        .build()
        .unwrap();
    let merge = &graph.nodes()[1];
    assert_eq!(merge.primary(), SourceSelector::None);
    assert_eq!(
        merge.merge_inputs.as_slice(),
        &[SourceSelector::Reference(NodeId(0)), SourceSelector::SourceGraphic]
    );
    assert_eq!(graph.nodes()[0].usage(), 1);

    let err = FilterGraph::builder()
        .node(NodeDesc::merge(Vec::new()))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("at least one"), "{err}");
}

#[test]
fn builder_defaults_to_user_space_and_linear_light() {
    let graph = FilterGraph::builder()
        .node(NodeDesc::blur(1.0))
        .build()
        .unwrap();
    assert_eq!(graph.primitive_units(), FilterUnits::UserSpace);
    assert_eq!(graph.color_space(), ColorSpace::LinearRgb);
    assert_eq!(*graph.region(), RegionSpec::default());
}
